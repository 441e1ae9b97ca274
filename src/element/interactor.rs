//! Polling element interactor
//!
//! Wraps a page handle with bounded waits and retries for element state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::driver::traits::{BrowserHandle, ElementHandle, LoadState, PageHandle};
use crate::element::Locator;
use crate::error::{Error, Result};
use crate::poll::poll_until;

/// Interval between element-state probes
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Interval between page-list probes while waiting for a new window
const WINDOW_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pause between clear retries in [`ElementInteractor::clear_text`]
const CLEAR_RETRY_PACE: Duration = Duration::from_millis(200);

/// Clear retries after the initial clear before giving up
const CLEAR_ATTEMPTS: u32 = 5;

/// Default budget for [`ElementInteractor::wait_clickable`]
const CLICKABLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default budget for [`ElementInteractor::wait_present`]
const PRESENT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default budget for [`ElementInteractor::wait_disappeared`]
const DISAPPEAR_TIMEOUT: Duration = Duration::from_secs(10);

/// Default budget for [`ElementInteractor::wait_has_value`]
const HAS_VALUE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default budget for [`ElementInteractor::switch_to_new_window`]
const WINDOW_TIMEOUT: Duration = Duration::from_secs(10);

/// Default budget for [`ElementInteractor::refresh_and_wait_visible`]
const REFRESH_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default appear budget for [`ElementInteractor::wait_flash_present_then_gone`]
const FLASH_APPEAR_TIMEOUT: Duration = Duration::from_secs(3);

/// Default disappear budget for [`ElementInteractor::wait_flash_present_then_gone`]
const FLASH_GONE_TIMEOUT: Duration = Duration::from_secs(5);

/// Load-wait budget in ms when settling back on the original window
const SWITCH_BACK_LOAD_TIMEOUT: u64 = 5_000;

/// Settle pause after a successful switch back
const SWITCH_BACK_SETTLE: Duration = Duration::from_millis(500);

/// Settle pause on the degraded switch-back path
const SWITCH_BACK_FALLBACK_SETTLE: Duration = Duration::from_secs(1);

/// Polling element interactor
///
/// Driver probes are single-shot; every wait here is a polling loop with an
/// explicit budget. The current page pointer is repointed by window switching.
pub struct ElementInteractor {
    /// Browser handle, used to enumerate windows
    browser: Arc<dyn BrowserHandle>,
    /// Current page
    page: Arc<dyn PageHandle>,
    /// Budget for operations without an explicit timeout
    default_timeout: Duration,
}

impl ElementInteractor {
    /// Create an interactor over a page
    pub fn new(
        browser: Arc<dyn BrowserHandle>,
        page: Arc<dyn PageHandle>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            browser,
            page,
            default_timeout,
        }
    }

    /// Current page handle
    pub fn page(&self) -> Arc<dyn PageHandle> {
        Arc::clone(&self.page)
    }

    /// Owning browser handle
    pub fn browser(&self) -> Arc<dyn BrowserHandle> {
        Arc::clone(&self.browser)
    }

    fn default_timeout_ms(&self) -> u64 {
        self.default_timeout.as_millis() as u64
    }

    fn not_visible_error(locator: &Locator) -> Error {
        Error::timeout(format!("Element not found or not visible: {}", locator))
    }

    /// Navigate the current page and wait for the DOM to be ready
    #[instrument(skip(self))]
    pub async fn open_url(&self, url: &str) -> Result<()> {
        debug!("Opening {}", url);
        self.page.navigate(url).await?;
        self.page
            .wait_for_load_state(LoadState::DOMContentLoaded, self.default_timeout_ms())
            .await
    }

    /// Wait until the current document is fully loaded
    #[instrument(skip(self))]
    pub async fn wait_for_page_loaded(&self) -> Result<()> {
        self.page
            .wait_for_load_state(LoadState::DOMContentLoaded, self.default_timeout_ms())
            .await?;
        self.page
            .wait_for_load_state(LoadState::Load, self.default_timeout_ms())
            .await
    }

    /// Wait for an element to be attached and return its handle
    #[instrument(skip(self, locator))]
    pub async fn find_element<L>(&self, locator: L) -> Result<Arc<dyn ElementHandle>>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        debug!("Finding element {}", locator);
        self.resolve_attached(&locator).await
    }

    /// Whether the element becomes visible within the default timeout
    ///
    /// Non-throwing sibling of [`ElementInteractor::wait_visible`]; probe
    /// errors count as not visible.
    #[instrument(skip(self, locator))]
    pub async fn is_visible<L>(&self, locator: L) -> bool
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        self.poll_visible(&locator, self.default_timeout).await
    }

    /// Wait for the element to be clickable, then click it
    #[instrument(skip(self, locator))]
    pub async fn click<L>(&self, locator: L) -> Result<()>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        debug!("Clicking {}", locator);
        self.wait_clickable(locator.clone(), Some(self.default_timeout))
            .await?;
        let element = self.resolve_now(&locator).await?;
        element.click().await
    }

    /// Click the element if it becomes visible, otherwise do nothing
    ///
    /// Waits the full default timeout for visibility before deciding.
    #[instrument(skip(self, locator))]
    pub async fn click_if_present<L>(&self, locator: L) -> Result<bool>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        if self.poll_visible(&locator, self.default_timeout).await {
            self.click(locator).await?;
            Ok(true)
        } else {
            debug!("{} not visible, skipping click", locator);
            Ok(false)
        }
    }

    /// Empty a field, retrying when change handlers restore its value
    ///
    /// An already-empty field returns `Ok(true)` without clearing. Spent
    /// retries log the remaining value and return `Ok(false)` instead of
    /// failing, so callers can decide whether a stubborn field matters.
    #[instrument(skip(self, locator))]
    pub async fn clear_text<L>(&self, locator: L) -> Result<bool>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        debug!("Clearing {}", locator);

        let element = self.resolve_attached(&locator).await?;
        let value = element.input_value().await?;
        if value.trim().is_empty() {
            return Ok(true);
        }

        if self.drain_value(&element, Some(CLEAR_RETRY_PACE)).await? {
            return Ok(true);
        }

        let remaining = element.input_value().await?;
        warn!("Could not clear {}, value still {:?}", locator, remaining);
        Ok(false)
    }

    /// Replace a field's value
    ///
    /// A non-empty field is cleared first with the same bounded retry as
    /// [`ElementInteractor::clear_text`], but without pacing and without
    /// aborting on exhaustion. The fill always runs.
    #[instrument(skip(self, locator, text))]
    pub async fn set_text<L, T>(&self, locator: L, text: T) -> Result<()>
    where
        L: Into<Locator>,
        T: fmt::Display,
    {
        let locator = locator.into();
        let text = text.to_string();
        debug!("Setting text in {}: {}", locator, text);

        let element = self.resolve_attached(&locator).await?;
        let value = element.input_value().await?;
        if !value.is_empty() && !self.drain_value(&element, None).await? {
            let remaining = element.input_value().await?;
            warn!(
                "Could not clear {} before fill, value still {:?}",
                locator, remaining
            );
        }

        element.fill(&text).await
    }

    /// Inner text of a visible element
    #[instrument(skip(self, locator))]
    pub async fn get_text<L>(&self, locator: L) -> Result<String>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        if !self.poll_visible(&locator, self.default_timeout).await {
            return Err(Self::not_visible_error(&locator));
        }
        let element = self.resolve_now(&locator).await?;
        element.text().await
    }

    /// Whether the element's inner text equals the expected string
    #[instrument(skip(self, locator))]
    pub async fn verify_text<L>(&self, locator: L, expected: &str) -> Result<bool>
    where
        L: Into<Locator>,
    {
        let text = self.get_text(locator).await?;
        Ok(text == expected)
    }

    /// Scroll an element into view and return its handle
    #[instrument(skip(self, locator))]
    pub async fn scroll_to<L>(&self, locator: L) -> Result<Arc<dyn ElementHandle>>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        debug!("Scrolling to {}", locator);
        let element = self.resolve_attached(&locator).await?;
        element.scroll_into_view().await?;
        Ok(element)
    }

    /// Wait for an element to be visible
    #[instrument(skip(self, locator))]
    pub async fn wait_visible<L>(&self, locator: L, timeout: Option<Duration>) -> Result<()>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        let timeout = timeout.unwrap_or(self.default_timeout);
        if self.poll_visible(&locator, timeout).await {
            Ok(())
        } else {
            Err(Self::not_visible_error(&locator))
        }
    }

    /// Wait for an element to be both visible and enabled
    ///
    /// The timeout message distinguishes a field that is visible but disabled
    /// from one that never became visible.
    #[instrument(skip(self, locator))]
    pub async fn wait_clickable<L>(&self, locator: L, timeout: Option<Duration>) -> Result<()>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        let timeout = timeout.unwrap_or(CLICKABLE_TIMEOUT);

        let page = Arc::clone(&self.page);
        let clickable = poll_until(timeout, POLL_INTERVAL, || {
            let page = Arc::clone(&page);
            let locator = locator.clone();
            async move {
                let element = Self::current_element(&page, &locator).await.ok().flatten()?;
                let visible = element.is_visible().await.unwrap_or(false);
                let enabled = element.is_enabled().await.unwrap_or(false);
                if visible && enabled {
                    Some(())
                } else {
                    None
                }
            }
        })
        .await;

        if clickable.is_some() {
            return Ok(());
        }

        let reason = match Self::current_element(&self.page, &locator).await {
            Ok(Some(element)) => {
                let visible = element.is_visible().await.unwrap_or(false);
                let enabled = element.is_enabled().await.unwrap_or(true);
                if visible && !enabled {
                    format!("Element is disabled: {}", locator)
                } else {
                    format!("Element not found or not visible: {}", locator)
                }
            }
            _ => format!("Element not found or not visible: {}", locator),
        };
        Err(Error::timeout(format!(
            "Element not clickable within {:?}: {}",
            timeout, reason
        )))
    }

    /// Wait for an element to be attached
    #[instrument(skip(self, locator))]
    pub async fn wait_present<L>(&self, locator: L, timeout: Option<Duration>) -> Result<()>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        let timeout = timeout.unwrap_or(PRESENT_TIMEOUT);
        self.poll_attached(&locator, timeout)
            .await
            .map(|_| ())
            .ok_or_else(|| {
                Error::timeout(format!("Element not present within {:?}: {}", timeout, locator))
            })
    }

    /// Wait for a transient element to appear and then go away
    ///
    /// Covers toasts and loading indicators that must have been shown before
    /// the flow continues.
    #[instrument(skip(self, locator))]
    pub async fn wait_flash_present_then_gone<L>(
        &self,
        locator: L,
        appear_timeout: Option<Duration>,
        gone_timeout: Option<Duration>,
    ) -> Result<()>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        let appear = appear_timeout.unwrap_or(FLASH_APPEAR_TIMEOUT);
        let gone = gone_timeout.unwrap_or(FLASH_GONE_TIMEOUT);

        if self.poll_attached(&locator, appear).await.is_none() {
            return Err(Error::timeout(format!(
                "Element not present within {:?}: {}",
                appear, locator
            )));
        }
        if !self.poll_gone(&locator, gone).await {
            return Err(Error::timeout(format!(
                "Flash element did not disappear within {:?}: {}",
                gone, locator
            )));
        }
        Ok(())
    }

    /// Wait for an element to be hidden or detached
    #[instrument(skip(self, locator))]
    pub async fn wait_disappeared<L>(&self, locator: L, timeout: Option<Duration>) -> Result<()>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        let timeout = timeout.unwrap_or(DISAPPEAR_TIMEOUT);
        if self.poll_gone(&locator, timeout).await {
            Ok(())
        } else {
            Err(Error::timeout(format!(
                "Element did not disappear within {:?}: {}",
                timeout, locator
            )))
        }
    }

    /// Reload the current page and wait for the network to go idle
    #[instrument(skip(self))]
    pub async fn refresh_page(&self) -> Result<()> {
        debug!("Refreshing page {}", self.page.id());
        self.page.reload().await?;
        self.page
            .wait_for_load_state(LoadState::NetworkIdle, self.default_timeout_ms())
            .await
    }

    /// Reload the page and wait for an element to be visible
    #[instrument(skip(self, locator))]
    pub async fn refresh_and_wait_visible<L>(
        &self,
        locator: L,
        timeout: Option<Duration>,
    ) -> Result<()>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        let timeout = timeout.unwrap_or(REFRESH_WAIT_TIMEOUT);
        self.refresh_page().await?;
        if self.poll_visible(&locator, timeout).await {
            Ok(())
        } else {
            Err(Self::not_visible_error(&locator))
        }
    }

    /// Wait for a field to carry a non-empty value
    ///
    /// Visibility is awaited first on the default budget; the value poll then
    /// runs on its own budget, swallowing transient read errors.
    #[instrument(skip(self, locator))]
    pub async fn wait_has_value<L>(&self, locator: L, timeout: Option<Duration>) -> Result<()>
    where
        L: Into<Locator>,
    {
        let locator = locator.into();
        let timeout = timeout.unwrap_or(HAS_VALUE_TIMEOUT);

        if !self.poll_visible(&locator, self.default_timeout).await {
            return Err(Self::not_visible_error(&locator));
        }

        let page = Arc::clone(&self.page);
        let got = poll_until(timeout, POLL_INTERVAL, || {
            let page = Arc::clone(&page);
            let locator = locator.clone();
            async move {
                let element = Self::current_element(&page, &locator).await.ok().flatten()?;
                match element.input_value().await {
                    Ok(value) if !value.trim().is_empty() => Some(()),
                    _ => None,
                }
            }
        })
        .await;

        got.ok_or_else(|| {
            Error::timeout(format!(
                "Element did not get a value within {:?}: {}",
                timeout, locator
            ))
        })
    }

    /// Wait for a window other than the current one and switch to it
    ///
    /// The new window is brought to front and awaited loaded before the
    /// interactor repoints to it. The handle is returned so the caller can
    /// keep the previous page for switching back.
    #[instrument(skip(self))]
    pub async fn switch_to_new_window(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Arc<dyn PageHandle>> {
        let timeout = timeout.unwrap_or(WINDOW_TIMEOUT);
        let original_id = self.page.id().to_string();
        debug!("Waiting for a new window (current {})", original_id);

        let browser = Arc::clone(&self.browser);
        let found = poll_until(timeout, WINDOW_POLL_INTERVAL, || {
            let browser = Arc::clone(&browser);
            let original_id = original_id.clone();
            async move {
                let pages = browser.pages().await.ok()?;
                if pages.len() < 2 {
                    return None;
                }
                pages
                    .into_iter()
                    .find(|p| p.id() != original_id && !p.is_closed())
            }
        })
        .await;

        let new_page = found
            .ok_or_else(|| Error::timeout(format!("No new window detected within {:?}", timeout)))?;

        new_page.bring_to_front().await?;
        new_page
            .wait_for_load_state(LoadState::DOMContentLoaded, self.default_timeout_ms())
            .await?;
        new_page
            .wait_for_load_state(LoadState::Load, self.default_timeout_ms())
            .await?;

        debug!("Switched to window {}", new_page.id());
        self.page = Arc::clone(&new_page);
        Ok(new_page)
    }

    /// Close every extra window and return to the original one
    ///
    /// Close failures on extra windows are logged, not raised. A closed
    /// original window is fatal; a load wait that fails while settling back
    /// only degrades to bring-to-front plus a longer pause.
    #[instrument(skip(self, original))]
    pub async fn close_window_and_switch_back(
        &mut self,
        original: Arc<dyn PageHandle>,
    ) -> Result<()> {
        let pages = self.browser.pages().await?;
        for page in pages {
            if page.id() == original.id() || page.is_closed() {
                continue;
            }
            debug!("Closing extra window {}", page.id());
            if let Err(e) = page.close().await {
                warn!("Closing window {}: {}", page.id(), e);
            }
        }

        self.page = Arc::clone(&original);

        if original.is_closed() {
            return Err(Error::invalid_state("Original window is already closed"));
        }

        match Self::settle_on(&original).await {
            Ok(()) => {
                tokio::time::sleep(SWITCH_BACK_SETTLE).await;
                Ok(())
            }
            Err(e) => {
                warn!("Original window did not settle after switch back: {}", e);
                if !original.is_closed() {
                    original.bring_to_front().await?;
                    tokio::time::sleep(SWITCH_BACK_FALLBACK_SETTLE).await;
                }
                Ok(())
            }
        }
    }

    /// Delegate a natural-language instruction to the current page
    #[instrument(skip(self))]
    pub async fn act(&self, instruction: &str) -> Result<()> {
        debug!("Acting on {}: {}", self.page.id(), instruction);
        self.page.act(instruction).await
    }

    /// Resolve the locator's current element, if any
    ///
    /// Selector locators are queried fresh on every call, so repeated
    /// resolution observes the live DOM. A pre-resolved handle is returned
    /// as-is; its state probes already run against the current document.
    async fn current_element(
        page: &Arc<dyn PageHandle>,
        locator: &Locator,
    ) -> Result<Option<Arc<dyn ElementHandle>>> {
        match locator {
            Locator::Handle(element) => Ok(Some(Arc::clone(element))),
            selector => page.query(&selector.to_string()).await,
        }
    }

    /// Poll until the element is attached, returning its handle
    async fn poll_attached(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Option<Arc<dyn ElementHandle>> {
        let page = Arc::clone(&self.page);
        poll_until(timeout, POLL_INTERVAL, || {
            let page = Arc::clone(&page);
            let locator = locator.clone();
            async move { Self::current_element(&page, &locator).await.ok().flatten() }
        })
        .await
    }

    /// Poll until the element is attached and visible
    async fn poll_visible(&self, locator: &Locator, timeout: Duration) -> bool {
        let page = Arc::clone(&self.page);
        poll_until(timeout, POLL_INTERVAL, || {
            let page = Arc::clone(&page);
            let locator = locator.clone();
            async move {
                let element = Self::current_element(&page, &locator).await.ok().flatten()?;
                match element.is_visible().await {
                    Ok(true) => Some(()),
                    _ => None,
                }
            }
        })
        .await
        .is_some()
    }

    /// Poll until the element is detached or hidden
    async fn poll_gone(&self, locator: &Locator, timeout: Duration) -> bool {
        let page = Arc::clone(&self.page);
        poll_until(timeout, POLL_INTERVAL, || {
            let page = Arc::clone(&page);
            let locator = locator.clone();
            async move {
                match Self::current_element(&page, &locator).await {
                    Ok(None) => Some(()),
                    Ok(Some(element)) => match element.is_visible().await {
                        Ok(false) => Some(()),
                        _ => None,
                    },
                    Err(_) => None,
                }
            }
        })
        .await
        .is_some()
    }

    /// Wait for attachment on the default budget or fail
    async fn resolve_attached(&self, locator: &Locator) -> Result<Arc<dyn ElementHandle>> {
        self.poll_attached(locator, self.default_timeout)
            .await
            .ok_or_else(|| Error::element_not_found(locator.to_string()))
    }

    /// Resolve the element right now, without waiting
    async fn resolve_now(&self, locator: &Locator) -> Result<Arc<dyn ElementHandle>> {
        Self::current_element(&self.page, locator)
            .await?
            .ok_or_else(|| Error::element_not_found(locator.to_string()))
    }

    /// Re-clear until the field reads empty, bounded by [`CLEAR_ATTEMPTS`]
    ///
    /// Some fields restore their value from change handlers after a clear, so
    /// a single clear is not trusted. Returns false once the retries are
    /// spent.
    async fn drain_value(
        &self,
        element: &Arc<dyn ElementHandle>,
        pace: Option<Duration>,
    ) -> Result<bool> {
        element.clear().await?;
        for _ in 0..CLEAR_ATTEMPTS {
            let value = element.input_value().await?;
            if value.trim().is_empty() {
                return Ok(true);
            }
            element.clear().await?;
            if let Some(pace) = pace {
                tokio::time::sleep(pace).await;
            }
        }
        Ok(false)
    }

    /// Bring a window to front and wait for it to be loaded
    async fn settle_on(page: &Arc<dyn PageHandle>) -> Result<()> {
        page.bring_to_front().await?;
        page.wait_for_load_state(LoadState::DOMContentLoaded, SWITCH_BACK_LOAD_TIMEOUT)
            .await?;
        page.wait_for_load_state(LoadState::Load, SWITCH_BACK_LOAD_TIMEOUT)
            .await?;
        Ok(())
    }
}

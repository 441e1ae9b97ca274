//! Mock driver implementation for testing
//!
//! Scriptable in-memory implementations of the driver traits. Elements can be
//! told to become visible after N probes, to resist clearing for N attempts,
//! or to fail probes transiently, which makes the polling and retry paths
//! testable without a browser.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::driver::traits::{
    BrowserDriver, BrowserHandle, ElementHandle, LaunchOptions, LoadState, PageHandle,
};
use crate::element::Locator;
use crate::error::{Error, Result};

/// Mock browser driver
///
/// Records every launch and hands out [`MockBrowser`] instances.
#[derive(Debug, Default)]
pub struct MockDriver {
    launches: Mutex<Vec<LaunchOptions>>,
    browsers: Mutex<Vec<Arc<MockBrowser>>>,
    fail_launches: AtomicBool,
}

impl MockDriver {
    /// Create a new mock driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver whose launches always fail
    pub fn failing() -> Self {
        let driver = Self::default();
        driver.fail_launches.store(true, Ordering::SeqCst);
        driver
    }

    /// Get the options of every launch so far (for testing)
    pub fn launch_options(&self) -> Vec<LaunchOptions> {
        self.launches.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Get every browser handed out so far (for testing)
    pub fn browsers(&self) -> Vec<Arc<MockBrowser>> {
        self.browsers.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn launch(&self, options: LaunchOptions) -> Result<Arc<dyn BrowserHandle>> {
        if self.fail_launches.load(Ordering::SeqCst) {
            return Err(Error::launch("mock launch failure"));
        }

        if let Ok(mut launches) = self.launches.lock() {
            launches.push(options);
        }

        let browser = MockBrowser::new();
        if let Ok(mut browsers) = self.browsers.lock() {
            browsers.push(Arc::clone(&browser));
        }

        Ok(browser as Arc<dyn BrowserHandle>)
    }
}

/// Mock browser handle
///
/// Starts with a single blank page, the way a freshly launched browser does.
#[derive(Debug)]
pub struct MockBrowser {
    id: String,
    pages: Mutex<Vec<Arc<MockPage>>>,
    is_active: AtomicBool,
}

impl MockBrowser {
    /// Create a new mock browser with one initial page
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            pages: Mutex::new(vec![MockPage::new()]),
            is_active: AtomicBool::new(true),
        })
    }

    /// Get the page at the given creation index (for testing)
    pub fn page(&self, index: usize) -> Option<Arc<MockPage>> {
        self.pages.lock().ok()?.get(index).cloned()
    }

    /// Open an extra page, as a popup or target=_blank link would (for testing)
    pub fn open_extra_page(&self) -> Arc<MockPage> {
        let page = MockPage::new();
        if let Ok(mut pages) = self.pages.lock() {
            pages.push(Arc::clone(&page));
        }
        page
    }
}

#[async_trait]
impl BrowserHandle for MockBrowser {
    fn id(&self) -> &str {
        &self.id
    }

    async fn pages(&self) -> Result<Vec<Arc<dyn PageHandle>>> {
        if !self.is_active() {
            return Err(Error::invalid_state("Browser is closed"));
        }
        let pages = self
            .pages
            .lock()
            .map_err(|_| Error::internal("Mock page list poisoned"))?;
        Ok(pages
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn PageHandle>)
            .collect())
    }

    async fn new_page(&self, url: &str) -> Result<Arc<dyn PageHandle>> {
        if !self.is_active() {
            return Err(Error::invalid_state("Browser is closed"));
        }
        let page = self.open_extra_page();
        page.record_navigation(url);
        Ok(page as Arc<dyn PageHandle>)
    }

    async fn close(&self) -> Result<()> {
        self.is_active.store(false, Ordering::SeqCst);
        if let Ok(pages) = self.pages.lock() {
            for page in pages.iter() {
                page.closed.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

/// Mock page handle
#[derive(Debug)]
pub struct MockPage {
    id: String,
    url: Mutex<String>,
    title: Mutex<String>,
    elements: Mutex<HashMap<String, Arc<MockElement>>>,
    navigations: Mutex<Vec<String>>,
    actions: Mutex<Vec<String>>,
    fail_acts: AtomicBool,
    reloads: AtomicU32,
    front_switches: AtomicU32,
    closed: AtomicBool,
}

impl MockPage {
    /// Create a new mock page
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            url: Mutex::new("about:blank".to_string()),
            title: Mutex::new(String::new()),
            elements: Mutex::new(HashMap::new()),
            navigations: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
            fail_acts: AtomicBool::new(false),
            reloads: AtomicU32::new(0),
            front_switches: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Make an element findable under the given selector (for testing)
    ///
    /// Keys go through [`Locator::parse`] so that `#id` and `css=#id` find
    /// the same element.
    pub fn install_element(&self, selector: &str, element: Arc<MockElement>) {
        let key = Locator::parse(selector).to_string();
        if let Ok(mut elements) = self.elements.lock() {
            elements.insert(key, element);
        }
    }

    /// Set the page title (for testing)
    pub fn set_title(&self, title: &str) {
        if let Ok(mut t) = self.title.lock() {
            *t = title.to_string();
        }
    }

    /// Make every act call fail (for testing)
    pub fn fail_acts(&self) {
        self.fail_acts.store(true, Ordering::SeqCst);
    }

    /// Get all navigated URLs (for testing)
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// Get all act instructions received (for testing)
    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Get how many times the page was reloaded (for testing)
    pub fn reload_count(&self) -> u32 {
        self.reloads.load(Ordering::SeqCst)
    }

    /// Get how many times the page was brought to front (for testing)
    pub fn front_switch_count(&self) -> u32 {
        self.front_switches.load(Ordering::SeqCst)
    }

    fn record_navigation(&self, url: &str) {
        if let Ok(mut navigations) = self.navigations.lock() {
            navigations.push(url.to_string());
        }
        if let Ok(mut current) = self.url.lock() {
            *current = url.to_string();
        }
    }
}

#[async_trait]
impl PageHandle for MockPage {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::invalid_state("Page is closed"));
        }
        self.record_navigation(url);
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_for_load_state(&self, _state: LoadState, _timeout: u64) -> Result<()> {
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.url.lock().map(|u| u.clone()).unwrap_or_default())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.title.lock().map(|t| t.clone()).unwrap_or_default())
    }

    async fn query(&self, selector: &str) -> Result<Option<Arc<dyn ElementHandle>>> {
        let key = Locator::parse(selector).to_string();
        let elements = self
            .elements
            .lock()
            .map_err(|_| Error::internal("Mock element map poisoned"))?;
        Ok(elements
            .get(&key)
            .filter(|element| element.is_present())
            .map(|element| Arc::clone(element) as Arc<dyn ElementHandle>))
    }

    async fn act(&self, instruction: &str) -> Result<()> {
        if self.fail_acts.load(Ordering::SeqCst) {
            return Err(Error::act("mock act failure"));
        }
        if let Ok(mut actions) = self.actions.lock() {
            actions.push(instruction.to_string());
        }
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn bring_to_front(&self) -> Result<()> {
        self.front_switches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Mock element handle
///
/// State is scripted through setters and observed through counters; the
/// probe countdowns let tests control exactly which poll succeeds.
#[derive(Debug)]
pub struct MockElement {
    locator: String,
    present: AtomicBool,
    visible: AtomicBool,
    enabled: AtomicBool,
    /// Probes reporting "not visible" before visibility is admitted
    visible_after: AtomicU32,
    /// Probes failing with an error before visibility reports work
    visible_failures: AtomicU32,
    /// Value reads failing with an error before reads work
    value_read_failures: AtomicU32,
    /// Clear attempts that leave the value untouched
    sticky_clears: AtomicU32,
    value: Mutex<String>,
    text: Mutex<String>,
    attributes: Mutex<HashMap<String, String>>,
    clear_calls: AtomicU32,
    clicks: AtomicU32,
    scrolls: AtomicU32,
    fills: Mutex<Vec<String>>,
}

impl MockElement {
    /// Create a new mock element
    pub fn new(locator: &str) -> Self {
        Self {
            locator: locator.to_string(),
            present: AtomicBool::new(true),
            visible: AtomicBool::new(true),
            enabled: AtomicBool::new(true),
            visible_after: AtomicU32::new(0),
            visible_failures: AtomicU32::new(0),
            value_read_failures: AtomicU32::new(0),
            sticky_clears: AtomicU32::new(0),
            value: Mutex::new(String::new()),
            text: Mutex::new(String::new()),
            attributes: Mutex::new(HashMap::new()),
            clear_calls: AtomicU32::new(0),
            clicks: AtomicU32::new(0),
            scrolls: AtomicU32::new(0),
            fills: Mutex::new(Vec::new()),
        }
    }

    /// Remove or restore the element in the DOM (for testing)
    pub fn set_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }

    /// Check whether the element is currently in the DOM
    pub fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    /// Set the visible flag (for testing)
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    /// Set the enabled flag (for testing)
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Report "not visible" for the next `probes` visibility checks (for testing)
    pub fn set_visible_after(&self, probes: u32) {
        self.visible_after.store(probes, Ordering::SeqCst);
    }

    /// Fail the next `probes` visibility checks with an error (for testing)
    pub fn fail_visibility_probes(&self, probes: u32) {
        self.visible_failures.store(probes, Ordering::SeqCst);
    }

    /// Fail the next `reads` value reads with an error (for testing)
    pub fn fail_value_reads(&self, reads: u32) {
        self.value_read_failures.store(reads, Ordering::SeqCst);
    }

    /// Ignore the next `attempts` clear calls, as a stubborn widget would (for testing)
    pub fn set_sticky_clears(&self, attempts: u32) {
        self.sticky_clears.store(attempts, Ordering::SeqCst);
    }

    /// Set the current input value (for testing)
    pub fn set_value(&self, value: &str) {
        if let Ok(mut v) = self.value.lock() {
            *v = value.to_string();
        }
    }

    /// Set the text content (for testing)
    pub fn set_text(&self, text: &str) {
        if let Ok(mut t) = self.text.lock() {
            *t = text.to_string();
        }
    }

    /// Set an attribute (for testing)
    pub fn set_attribute(&self, name: &str, value: &str) {
        if let Ok(mut attributes) = self.attributes.lock() {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Get how many times clear was called (for testing)
    pub fn clear_calls(&self) -> u32 {
        self.clear_calls.load(Ordering::SeqCst)
    }

    /// Get how many times the element was clicked (for testing)
    pub fn click_count(&self) -> u32 {
        self.clicks.load(Ordering::SeqCst)
    }

    /// Get how many times the element was scrolled into view (for testing)
    pub fn scroll_count(&self) -> u32 {
        self.scrolls.load(Ordering::SeqCst)
    }

    /// Get every value passed to fill (for testing)
    pub fn fills(&self) -> Vec<String> {
        self.fills.lock().map(|f| f.clone()).unwrap_or_default()
    }

    fn require_present(&self) -> Result<()> {
        if self.is_present() {
            Ok(())
        } else {
            Err(Error::element_not_found(self.locator.clone()))
        }
    }

    /// Consume one unit from a countdown, reporting whether any remained
    fn consume(counter: &AtomicU32) -> bool {
        let remaining = counter.load(Ordering::SeqCst);
        if remaining > 0 {
            counter.store(remaining - 1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl ElementHandle for MockElement {
    fn selector(&self) -> &str {
        &self.locator
    }

    async fn is_visible(&self) -> Result<bool> {
        if Self::consume(&self.visible_failures) {
            return Err(Error::cdp("mock visibility probe failure"));
        }
        if !self.is_present() {
            return Ok(false);
        }
        if Self::consume(&self.visible_after) {
            return Ok(false);
        }
        Ok(self.visible.load(Ordering::SeqCst))
    }

    async fn is_enabled(&self) -> Result<bool> {
        self.require_present()?;
        Ok(self.enabled.load(Ordering::SeqCst))
    }

    async fn text(&self) -> Result<String> {
        self.require_present()?;
        Ok(self.text.lock().map(|t| t.clone()).unwrap_or_default())
    }

    async fn input_value(&self) -> Result<String> {
        self.require_present()?;
        if Self::consume(&self.value_read_failures) {
            return Err(Error::cdp("mock value read failure"));
        }
        Ok(self.value.lock().map(|v| v.clone()).unwrap_or_default())
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        self.require_present()?;
        Ok(self
            .attributes
            .lock()
            .ok()
            .and_then(|attributes| attributes.get(name).cloned()))
    }

    async fn clear(&self) -> Result<()> {
        self.require_present()?;
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        if !Self::consume(&self.sticky_clears) {
            if let Ok(mut value) = self.value.lock() {
                value.clear();
            }
        }
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<()> {
        self.require_present()?;
        if let Ok(mut fills) = self.fills.lock() {
            fills.push(text.to_string());
        }
        if let Ok(mut value) = self.value.lock() {
            *value = text.to_string();
        }
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        self.require_present()?;
        self.clicks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.require_present()?;
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_driver_records_launches() {
        let driver = MockDriver::new();
        let browser = driver
            .launch(LaunchOptions {
                debug_port: 9300,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(browser.is_active());
        assert_eq!(driver.launch_options().len(), 1);
        assert_eq!(driver.launch_options()[0].debug_port, 9300);
        assert_eq!(driver.browsers().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_driver() {
        let driver = MockDriver::failing();
        let result = driver.launch(LaunchOptions::default()).await;
        assert!(matches!(result, Err(Error::Launch(_))));
    }

    #[tokio::test]
    async fn test_browser_starts_with_one_page() {
        let browser = MockBrowser::new();
        let pages = browser.pages().await.unwrap();
        assert_eq!(pages.len(), 1);

        browser.open_extra_page();
        assert_eq!(browser.pages().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_element_visible_after_countdown() {
        let element = MockElement::new("#spinner");
        element.set_visible_after(2);

        assert!(!element.is_visible().await.unwrap());
        assert!(!element.is_visible().await.unwrap());
        assert!(element.is_visible().await.unwrap());
    }

    #[tokio::test]
    async fn test_element_sticky_clears() {
        let element = MockElement::new("input#q");
        element.set_value("old");
        element.set_sticky_clears(1);

        element.clear().await.unwrap();
        assert_eq!(element.input_value().await.unwrap(), "old");

        element.clear().await.unwrap();
        assert_eq!(element.input_value().await.unwrap(), "");
        assert_eq!(element.clear_calls(), 2);
    }

    #[tokio::test]
    async fn test_absent_element_rejects_interaction() {
        let element = MockElement::new("#gone");
        element.set_present(false);

        assert!(!element.is_visible().await.unwrap());
        assert!(matches!(
            element.click().await,
            Err(Error::ElementNotFound(_))
        ));
    }
}

//! CDP browser handle
//!
//! Wraps a launched browser process and its DevTools endpoints. Page targets
//! are discovered over the HTTP target list and attached lazily; handles are
//! cached in first-seen order so the original page stays first and later
//! windows follow in creation order.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::driver::cdp::connection::CdpConnection;
use crate::driver::cdp::launcher::LaunchedBrowser;
use crate::driver::cdp::page::CdpPage;
use crate::driver::traits::{BrowserHandle, LaunchOptions, PageHandle};
use crate::error::{Error, Result};

/// How long to wait for the process to exit after Browser.close
const CHILD_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// CDP browser handle implementation
#[derive(Debug)]
pub struct CdpBrowser {
    id: String,
    /// DevTools HTTP endpoint, e.g. "http://127.0.0.1:9345"
    http_endpoint: String,
    http: reqwest::Client,
    /// Browser-level CDP connection
    connection: Arc<CdpConnection>,
    /// The browser child process
    child: Arc<Mutex<Child>>,
    options: LaunchOptions,
    /// Attached page handles (target_id -> handle) in first-seen order
    pages: Mutex<Vec<(String, Arc<CdpPage>)>>,
    is_active: AtomicBool,
}

impl CdpBrowser {
    /// Wrap a launched browser process
    pub async fn new(launched: LaunchedBrowser, options: LaunchOptions) -> Result<Arc<Self>> {
        let connection = CdpConnection::connect(
            &launched.browser_ws_url,
            Duration::from_millis(options.command_timeout),
        )
        .await?;

        Ok(Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            http_endpoint: launched.http_endpoint,
            http: reqwest::Client::new(),
            connection,
            child: launched.child,
            options,
            pages: Mutex::new(Vec::new()),
            is_active: AtomicBool::new(true),
        }))
    }

    /// Fetch the raw target list from the DevTools HTTP endpoint
    async fn fetch_targets(&self) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/json/list", self.http_endpoint);
        let response = self.http.get(&url).send().await?;
        Ok(response.json().await?)
    }

    /// Extract page targets as (id, ws_url) in creation order
    ///
    /// DevTools lists the newest target first, so the order is reversed.
    /// Non-page targets and DevTools' own pages are skipped.
    fn parse_page_targets(targets: &[serde_json::Value]) -> Vec<(String, String)> {
        targets
            .iter()
            .rev()
            .filter_map(|target| {
                let target_type = target.get("type").and_then(|v| v.as_str())?;
                if target_type != "page" {
                    return None;
                }

                let url = target.get("url").and_then(|v| v.as_str()).unwrap_or("");
                if url.starts_with("devtools://") {
                    return None;
                }

                let id = target.get("id").and_then(|v| v.as_str())?;
                let ws = target
                    .get("webSocketDebuggerUrl")
                    .and_then(|v| v.as_str())?;
                Some((id.to_string(), ws.to_string()))
            })
            .collect()
    }

    /// Connect to a page target and build its handle
    async fn attach_page(&self, target_id: &str, ws_url: &str) -> Result<Arc<CdpPage>> {
        let connection = CdpConnection::connect(
            ws_url,
            Duration::from_millis(self.options.command_timeout),
        )
        .await?;
        CdpPage::attach(target_id.to_string(), connection, &self.options).await
    }
}

#[async_trait]
impl BrowserHandle for CdpBrowser {
    fn id(&self) -> &str {
        &self.id
    }

    async fn pages(&self) -> Result<Vec<Arc<dyn PageHandle>>> {
        if !self.is_active() {
            return Err(Error::invalid_state("Browser is closed"));
        }

        let targets = self.fetch_targets().await?;
        let listed = Self::parse_page_targets(&targets);

        let mut cache = self.pages.lock().await;

        // Drop handles whose targets disappeared.
        cache.retain(|(id, page)| {
            let alive = listed.iter().any(|(listed_id, _)| listed_id == id);
            if !alive {
                page.mark_closed();
            }
            alive
        });

        for (id, ws) in listed {
            if cache.iter().any(|(cached_id, _)| cached_id == &id) {
                continue;
            }
            match self.attach_page(&id, &ws).await {
                Ok(page) => cache.push((id, page)),
                Err(e) => warn!("Failed to attach to page target {}: {}", id, e),
            }
        }

        Ok(cache
            .iter()
            .map(|(_, page)| Arc::clone(page) as Arc<dyn PageHandle>)
            .collect())
    }

    async fn new_page(&self, url: &str) -> Result<Arc<dyn PageHandle>> {
        if !self.is_active() {
            return Err(Error::invalid_state("Browser is closed"));
        }

        debug!("Creating new page target at {}", url);

        let endpoint = format!("{}/json/new?{}", self.http_endpoint, url);
        let response = self.http.put(&endpoint).send().await?;
        if !response.status().is_success() {
            return Err(Error::cdp(format!(
                "/json/new returned {}",
                response.status()
            )));
        }

        let target: serde_json::Value = response.json().await?;
        let id = target
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No id in new target response"))?;
        let ws = target
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No webSocketDebuggerUrl in new target response"))?;

        let page = self.attach_page(id, ws).await?;
        self.pages
            .lock()
            .await
            .push((id.to_string(), Arc::clone(&page)));

        Ok(page as Arc<dyn PageHandle>)
    }

    async fn close(&self) -> Result<()> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Closing browser {}", self.id);

        let pages: Vec<(String, Arc<CdpPage>)> = self.pages.lock().await.drain(..).collect();
        for (target_id, page) in pages {
            if let Err(e) = page.close().await {
                warn!("Failed to close page {}: {}", target_id, e);
            }
        }

        if let Err(e) = self
            .connection
            .send_command("Browser.close", serde_json::Value::Null)
            .await
        {
            warn!("Browser.close failed: {}", e);
        }
        let _ = self.connection.close().await;

        let mut child = self.child.lock().await;
        match tokio::time::timeout(CHILD_EXIT_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => debug!("Browser process exited: {}", status),
            Ok(Err(e)) => warn!("Failed to reap browser process: {}", e),
            Err(_) => {
                warn!("Browser did not exit after close; killing process");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill browser process: {}", e);
                }
            }
        }

        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

//! CDP page handle
//!
//! One attached page target: navigation, load-state tracking, script
//! evaluation, and natural-language act delegation. Load states are tracked
//! as level flags fed by lifecycle events, so waiting for a state that was
//! already reached returns immediately instead of hanging on a missed event.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::driver::cdp::connection::{CdpConnection, CdpEvent};
use crate::driver::cdp::element::CdpElement;
use crate::driver::cdp::js::JsBuilder;
use crate::driver::traits::{ElementHandle, LaunchOptions, LoadState, PageHandle};
use crate::element::Locator;
use crate::error::{Error, Result};
use crate::poll::poll_until;

/// Interval between load-state probes
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Accumulated load milestones for the current document
///
/// Reset when a new navigation starts, then set as lifecycle events arrive.
#[derive(Debug, Clone, Copy, Default)]
struct LifecycleState {
    dom_content_loaded: bool,
    load: bool,
    network_idle: bool,
}

/// CDP page handle implementation
#[derive(Debug)]
pub struct CdpPage {
    /// DevTools target ID
    target_id: String,
    /// Per-target WebSocket connection
    connection: Arc<CdpConnection>,
    /// Load milestones for the current document
    lifecycle: Arc<RwLock<LifecycleState>>,
    /// Set once the page is closed or its target disappears
    closed: AtomicBool,
    /// Model backend for act delegation
    model: ModelConfig,
    /// HTTP client for the act endpoint
    http: reqwest::Client,
}

impl CdpPage {
    /// Attach to a page target
    ///
    /// Enables the Page and Runtime domains, applies the user agent and
    /// viewport overrides from the launch options, and starts routing
    /// lifecycle events into the load-state flags.
    pub async fn attach(
        target_id: String,
        connection: Arc<CdpConnection>,
        options: &LaunchOptions,
    ) -> Result<Arc<Self>> {
        let page = Arc::new(Self {
            target_id,
            connection,
            lifecycle: Arc::new(RwLock::new(LifecycleState::default())),
            closed: AtomicBool::new(false),
            model: options.model.clone(),
            http: reqwest::Client::new(),
        });

        page.connection
            .send_command("Page.enable", serde_json::Value::Null)
            .await?;
        page.connection
            .send_command("Runtime.enable", serde_json::Value::Null)
            .await?;
        page.connection
            .send_command("Page.setLifecycleEventsEnabled", json!({"enabled": true}))
            .await?;

        if let Some(user_agent) = &options.user_agent {
            if !user_agent.is_empty() {
                page.connection
                    .send_command("Network.enable", serde_json::Value::Null)
                    .await?;
                page.connection
                    .send_command(
                        "Network.setUserAgentOverride",
                        json!({"userAgent": user_agent}),
                    )
                    .await?;
                debug!("User agent override applied to {}", page.target_id);
            }
        }

        page.connection
            .send_command(
                "Emulation.setDeviceMetricsOverride",
                json!({
                    "width": options.window_width,
                    "height": options.window_height,
                    "deviceScaleFactor": 1,
                    "mobile": false,
                }),
            )
            .await?;

        let events = page.connection.subscribe().await;
        tokio::spawn(Self::lifecycle_loop(events, Arc::clone(&page.lifecycle)));

        page.seed_lifecycle().await;

        Ok(page)
    }

    /// Mark the page closed without sending anything
    ///
    /// Used when the target disappears from the browser's target list.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Seed load flags from the document's current ready state
    ///
    /// Lifecycle events fired before we attached are lost; an already-loaded
    /// document must not make load waits hang for the full budget.
    async fn seed_lifecycle(&self) {
        let ready_state = match self.connection.evaluate("document.readyState").await {
            Ok(serde_json::Value::String(s)) => s,
            _ => return,
        };

        if let Ok(mut state) = self.lifecycle.write() {
            match ready_state.as_str() {
                "complete" => {
                    state.dom_content_loaded = true;
                    state.load = true;
                    state.network_idle = true;
                }
                "interactive" => state.dom_content_loaded = true,
                _ => {}
            }
        }
    }

    /// Clear load flags ahead of a navigation
    fn reset_lifecycle(&self) {
        if let Ok(mut state) = self.lifecycle.write() {
            *state = LifecycleState::default();
        }
    }

    /// Route lifecycle events into the load flags
    async fn lifecycle_loop(
        mut events: mpsc::UnboundedReceiver<CdpEvent>,
        lifecycle: Arc<RwLock<LifecycleState>>,
    ) {
        while let Some(event) = events.recv().await {
            let mut state = match lifecycle.write() {
                Ok(guard) => guard,
                Err(_) => break,
            };

            match event.method.as_str() {
                "Page.lifecycleEvent" => {
                    let name = event
                        .params
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    match name {
                        "init" => *state = LifecycleState::default(),
                        "DOMContentLoaded" => state.dom_content_loaded = true,
                        "load" => state.load = true,
                        "networkIdle" => state.network_idle = true,
                        _ => {}
                    }
                }
                "Page.domContentEventFired" => state.dom_content_loaded = true,
                "Page.loadEventFired" => state.load = true,
                _ => {}
            }
        }
    }
}

#[async_trait]
impl PageHandle for CdpPage {
    fn id(&self) -> &str {
        &self.target_id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating {} to {}", self.target_id, url);

        self.reset_lifecycle();

        let result = self
            .connection
            .send_command("Page.navigate", json!({"url": url}))
            .await?;

        if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
            if !error_text.is_empty() {
                return Err(Error::navigation_failed(format!("{}: {}", url, error_text)));
            }
        }

        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        debug!("Reloading {}", self.target_id);

        self.reset_lifecycle();
        self.connection
            .send_command("Page.reload", serde_json::Value::Null)
            .await?;
        Ok(())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: u64) -> Result<()> {
        let lifecycle = Arc::clone(&self.lifecycle);

        let reached = poll_until(Duration::from_millis(timeout), LOAD_POLL_INTERVAL, || {
            let lifecycle = Arc::clone(&lifecycle);
            async move {
                let snapshot = lifecycle.read().map(|s| *s).unwrap_or_default();
                let done = match state {
                    LoadState::DOMContentLoaded => snapshot.dom_content_loaded || snapshot.load,
                    LoadState::Load => snapshot.load,
                    LoadState::NetworkIdle => snapshot.network_idle,
                };
                if done {
                    Some(())
                } else {
                    None
                }
            }
        })
        .await;

        reached.ok_or_else(|| {
            Error::timeout(format!(
                "Page did not reach {:?} within {}ms",
                state, timeout
            ))
        })
    }

    async fn url(&self) -> Result<String> {
        match self.connection.evaluate("window.location.href").await? {
            serde_json::Value::String(url) => Ok(url),
            other => Err(Error::cdp(format!("Unexpected URL result: {}", other))),
        }
    }

    async fn title(&self) -> Result<String> {
        match self.connection.evaluate("document.title").await? {
            serde_json::Value::String(title) => Ok(title),
            _ => Ok(String::new()),
        }
    }

    async fn query(&self, selector: &str) -> Result<Option<Arc<dyn ElementHandle>>> {
        let locator = Locator::parse(selector);
        let js = JsBuilder::new(locator);

        match self.connection.evaluate(&js.exists_script()).await? {
            serde_json::Value::Null => Ok(None),
            _ => Ok(Some(Arc::new(CdpElement::new(
                Arc::clone(&self.connection),
                js,
            )) as Arc<dyn ElementHandle>)),
        }
    }

    async fn act(&self, instruction: &str) -> Result<()> {
        let endpoint = self
            .model
            .act_endpoint
            .as_ref()
            .ok_or_else(|| Error::configuration("WEBRIG_ACT_ENDPOINT is not set"))?;

        debug!("Acting on {}: {}", self.target_id, instruction);

        let mut request = self.http.post(endpoint).json(&json!({
            "instruction": instruction,
            "model": self.model.model_name,
            "targetId": self.target_id,
        }));
        if let Some(key) = &self.model.model_api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::act(format!(
                "Act endpoint returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        if body.get("success").and_then(|v| v.as_bool()) == Some(false) {
            let message = body
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("action was not performed");
            return Err(Error::act(message));
        }

        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.connection.evaluate(script).await
    }

    async fn bring_to_front(&self) -> Result<()> {
        self.connection
            .send_command("Page.bringToFront", serde_json::Value::Null)
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        debug!("Closing page {}", self.target_id);

        // The target dies on Page.close, so the reply may never arrive.
        if let Err(e) = self
            .connection
            .send_command("Page.close", serde_json::Value::Null)
            .await
        {
            warn!("Page.close for {}: {}", self.target_id, e);
        }

        self.connection.close().await
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || !self.connection.is_active()
    }
}

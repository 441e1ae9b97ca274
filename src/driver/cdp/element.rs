//! CDP element handle
//!
//! Element operations evaluated over the page's CDP connection. The handle
//! keeps only the locator, so every call re-resolves the element and acts on
//! whatever currently matches in the DOM.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::driver::cdp::connection::CdpConnection;
use crate::driver::cdp::js::JsBuilder;
use crate::driver::traits::ElementHandle;
use crate::error::{Error, Result};

/// Result of the visibility check script
#[derive(Debug, Deserialize)]
struct VisibilityReport {
    visible: bool,
    reason: String,
}

/// Result of the enabled check script
#[derive(Debug, Deserialize)]
struct EnabledReport {
    enabled: bool,
    reason: String,
}

/// Result of the attribute read script
#[derive(Debug, Deserialize)]
struct AttributeReport {
    value: Option<String>,
}

/// CDP element handle implementation
#[derive(Debug)]
pub struct CdpElement {
    connection: Arc<CdpConnection>,
    js: JsBuilder,
}

impl CdpElement {
    /// Create a handle for the given locator
    pub fn new(connection: Arc<CdpConnection>, js: JsBuilder) -> Self {
        Self { connection, js }
    }

    /// Evaluate a script that must find the element
    ///
    /// A `null` result means the element vanished between resolution and this
    /// call, which is reported as a not-found error.
    async fn eval_required(&self, script: &str) -> Result<serde_json::Value> {
        match self.connection.evaluate(script).await? {
            serde_json::Value::Null => {
                Err(Error::element_not_found(self.js.locator().to_string()))
            }
            value => Ok(value),
        }
    }

    /// Parse a JSON report produced by a check script
    fn parse_report<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
        match value {
            serde_json::Value::String(text) => Ok(serde_json::from_str(&text)?),
            other => Ok(serde_json::from_value(other)?),
        }
    }
}

#[async_trait]
impl ElementHandle for CdpElement {
    fn selector(&self) -> &str {
        self.js.locator().as_str()
    }

    /// Check visibility; an absent element counts as not visible
    async fn is_visible(&self) -> Result<bool> {
        match self.connection.evaluate(&self.js.is_visible_script()).await? {
            serde_json::Value::Null => Ok(false),
            value => {
                let report: VisibilityReport = Self::parse_report(value)?;
                if !report.visible {
                    debug!("{} not visible: {}", self.js.locator(), report.reason);
                }
                Ok(report.visible)
            }
        }
    }

    async fn is_enabled(&self) -> Result<bool> {
        let value = self.eval_required(&self.js.is_enabled_script()).await?;
        let report: EnabledReport = Self::parse_report(value)?;
        if !report.enabled {
            debug!("{} not enabled: {}", self.js.locator(), report.reason);
        }
        Ok(report.enabled)
    }

    async fn text(&self) -> Result<String> {
        let value = self.eval_required(&self.js.text_script()).await?;
        match value {
            serde_json::Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    async fn input_value(&self) -> Result<String> {
        let value = self.eval_required(&self.js.value_script()).await?;
        match value {
            serde_json::Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        let value = self.eval_required(&self.js.attribute_script(name)).await?;
        let report: AttributeReport = Self::parse_report(value)?;
        Ok(report.value)
    }

    async fn clear(&self) -> Result<()> {
        self.eval_required(&self.js.clear_script()).await?;
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<()> {
        self.eval_required(&self.js.fill_script(text)).await?;
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        self.eval_required(&self.js.click_script()).await?;
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.eval_required(&self.js.scroll_into_view_script()).await?;
        Ok(())
    }
}

//! Browser driver traits
//!
//! This module defines the abstract interfaces between the harness and a
//! concrete browser backend. The session manager launches browsers through
//! [`BrowserDriver`], and the element interactor talks to pages and elements
//! through [`PageHandle`] and [`ElementHandle`] without knowing whether the
//! other side is a real CDP connection or a mock.

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ModelConfig;
use crate::Error;

/// Options for launching a browser
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Headless mode (no GUI)
    pub headless: bool,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
    /// User agent string
    pub user_agent: Option<String>,
    /// Additional arguments to pass to the browser
    pub args: Vec<String>,
    /// Browser executable path
    pub executable_path: Option<String>,
    /// Remote debugging port
    pub debug_port: u16,
    /// Profile scratch directory
    pub user_data_dir: Option<PathBuf>,
    /// Launch readiness timeout in milliseconds
    pub launch_timeout: u64,
    /// Per-command timeout in milliseconds
    pub command_timeout: u64,
    /// Model backend used to resolve natural-language actions
    pub model: ModelConfig,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
            args: vec![],
            executable_path: None,
            debug_port: 9222,
            user_data_dir: None,
            launch_timeout: 30000,
            command_timeout: 30000,
            model: ModelConfig::default(),
        }
    }
}

/// Page load state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Load,
    DOMContentLoaded,
    NetworkIdle,
}

/// Browser driver trait
///
/// Launches browser instances. The production implementation spawns a
/// Chromium process and attaches over CDP; tests substitute a mock.
#[async_trait]
pub trait BrowserDriver: Send + Sync + Debug {
    /// Launch a browser with the given options
    async fn launch(&self, options: LaunchOptions) -> Result<Arc<dyn BrowserHandle>, Error>;
}

/// Browser handle trait
///
/// Represents a running browser instance.
#[async_trait]
pub trait BrowserHandle: Send + Sync + Debug {
    /// Get browser ID
    fn id(&self) -> &str;

    /// Get all open pages, oldest first
    async fn pages(&self) -> Result<Vec<Arc<dyn PageHandle>>, Error>;

    /// Open a new page at the given URL
    async fn new_page(&self, url: &str) -> Result<Arc<dyn PageHandle>, Error>;

    /// Close the browser
    async fn close(&self) -> Result<(), Error>;

    /// Check if browser is active
    fn is_active(&self) -> bool;
}

/// Page handle trait
///
/// Represents a page/tab in a browser.
#[async_trait]
pub trait PageHandle: Send + Sync + Debug {
    /// Get page ID
    fn id(&self) -> &str;

    /// Start navigating to URL
    ///
    /// Returns once the navigation is accepted; load progress is observed
    /// through [`PageHandle::wait_for_load_state`].
    async fn navigate(&self, url: &str) -> Result<(), Error>;

    /// Reload the page
    async fn reload(&self) -> Result<(), Error>;

    /// Wait for the page to reach a load state
    async fn wait_for_load_state(&self, state: LoadState, timeout: u64) -> Result<(), Error>;

    /// Get current URL
    async fn url(&self) -> Result<String, Error>;

    /// Get page title
    async fn title(&self) -> Result<String, Error>;

    /// Query a single element, `None` when absent
    async fn query(&self, selector: &str) -> Result<Option<Arc<dyn ElementHandle>>, Error>;

    /// Perform a natural-language action on the page
    async fn act(&self, instruction: &str) -> Result<(), Error>;

    /// Evaluate JavaScript in the page
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, Error>;

    /// Bring this page to the foreground
    async fn bring_to_front(&self) -> Result<(), Error>;

    /// Close the page
    async fn close(&self) -> Result<(), Error>;

    /// Check if page has been closed
    fn is_closed(&self) -> bool;
}

/// Element handle trait
///
/// Represents a DOM element in a page.
#[async_trait]
pub trait ElementHandle: Send + Sync + Debug {
    /// Selector description this handle was resolved from
    fn selector(&self) -> &str;

    /// Check if element is visible
    async fn is_visible(&self) -> Result<bool, Error>;

    /// Check if element is enabled for interaction
    async fn is_enabled(&self) -> Result<bool, Error>;

    /// Get element text content
    async fn text(&self) -> Result<String, Error>;

    /// Get current input value
    async fn input_value(&self) -> Result<String, Error>;

    /// Get element attribute
    async fn get_attribute(&self, name: &str) -> Result<Option<String>, Error>;

    /// Clear input content
    async fn clear(&self) -> Result<(), Error>;

    /// Fill input with text
    async fn fill(&self, text: &str) -> Result<(), Error>;

    /// Click element
    async fn click(&self) -> Result<(), Error>;

    /// Scroll element into view
    async fn scroll_into_view(&self) -> Result<(), Error>;
}

//! # Chrome DevTools Protocol (CDP) 后端
//!
//! 通过 Chrome DevTools Protocol 驱动真实 Chromium 浏览器的后端实现。
//!
//! ## 主要功能
//! - **进程启动**: 以独立配置目录和调试端口启动 Chromium 进程
//! - **WebSocket 通信**: 与浏览器和页面目标建立 CDP WebSocket 连接
//! - **页面管理**: 通过 DevTools HTTP 接口发现并附加页面目标
//! - **元素操作**: 基于 JavaScript 求值实现元素查询与交互
//!
//! ## 模块结构
//! - `launcher`: Chromium 进程启动与就绪探测
//! - `connection`: CDP WebSocket 连接实现
//! - `browser`: 浏览器级别的句柄
//! - `page`: 页面目标句柄
//! - `element`: 元素句柄
//! - `js`: 元素操作的 JavaScript 代码生成
//!
//! ## 使用示例
//! ```rust,no_run
//! use webrig::driver::cdp::CdpDriver;
//! use webrig::driver::traits::{BrowserDriver, BrowserHandle, LaunchOptions, LoadState, PageHandle};
//!
//! # async fn example() -> Result<(), webrig::Error> {
//! let driver = CdpDriver::new();
//! let browser = driver.launch(LaunchOptions::default()).await?;
//! let page = browser.new_page("about:blank").await?;
//! page.navigate("https://example.com").await?;
//! page.wait_for_load_state(LoadState::Load, 30000).await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod connection;
pub mod element;
pub mod js;
pub mod launcher;
pub mod page;

pub use browser::CdpBrowser;
pub use connection::{CdpConnection, CdpEvent};
pub use element::CdpElement;
pub use js::JsBuilder;
pub use launcher::{ChromiumLauncher, LaunchedBrowser, STABILITY_ARGS};
pub use page::CdpPage;

use async_trait::async_trait;
use std::sync::Arc;

use crate::driver::traits::{BrowserDriver, BrowserHandle, LaunchOptions};
use crate::error::Result;

/// CDP-backed browser driver
///
/// Launches a Chromium process for every [`BrowserDriver::launch`] call and
/// exposes it through the driver traits.
#[derive(Debug, Clone, Default)]
pub struct CdpDriver {
    launcher: ChromiumLauncher,
}

impl CdpDriver {
    /// Create a new CDP driver
    pub fn new() -> Self {
        Self {
            launcher: ChromiumLauncher::new(),
        }
    }
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    async fn launch(&self, options: LaunchOptions) -> Result<Arc<dyn BrowserHandle>> {
        let launched = self.launcher.launch(&options).await?;
        let browser = CdpBrowser::new(launched, options).await?;
        Ok(browser as Arc<dyn BrowserHandle>)
    }
}

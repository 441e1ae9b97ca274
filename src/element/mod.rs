//! # 元素交互
//!
//! 提供定位器解析与基于轮询的元素交互功能。
//!
//! ## 主要功能
//! - **定位器**: CSS 选择器、XPath 表达式与已解析元素句柄的统一表示
//! - **状态等待**: 可见、可点击、消失、有值等条件的有界轮询
//! - **输入操作**: 带重试的清空与无条件填充
//! - **多窗口**: 切换到新窗口与关闭后切回原窗口
//!
//! ## 定位器类型
//! - `Css`: CSS 选择器（如 `.class`, `#id`, `[attr=value]`）
//! - `XPath`: XPath 表达式（如 `//button[@type='submit']`）
//! - `Handle`: 已解析的元素句柄（跳过选择器查询，直接探测元素状态）
//!
//! ## 模块结构
//! - `locator`: 定位器解析与格式化
//! - `interactor`: 轮询交互器实现
//!
//! ## 使用示例
//! ```rust,no_run
//! use std::time::Duration;
//! use webrig::driver::mock::MockDriver;
//! use webrig::driver::traits::{BrowserDriver, BrowserHandle, LaunchOptions};
//! use webrig::element::{ElementInteractor, Locator};
//!
//! # async fn example() -> Result<(), webrig::Error> {
//! let driver = MockDriver::new();
//! let browser = driver.launch(LaunchOptions::default()).await?;
//! let page = browser.pages().await?.remove(0);
//! let interactor = ElementInteractor::new(browser, page, Duration::from_secs(30));
//!
//! interactor.set_text(Locator::css("#email"), "user@example.com").await?;
//! interactor.click("#submit").await?;
//! interactor.wait_disappeared(".spinner", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod interactor;
pub mod locator;

#[cfg(test)]
mod tests;

pub use interactor::ElementInteractor;
pub use locator::Locator;

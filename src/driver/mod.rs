//! # 浏览器驱动层
//!
//! 定义会话管理器与具体浏览器后端之间的抽象接口，并提供 CDP 实现和测试用 Mock 实现。
//!
//! ## 主要功能
//! - **驱动抽象**: 浏览器启动、页面操作和元素操作的 trait 定义
//! - **CDP 后端**: 基于 Chrome DevTools Protocol 的真实浏览器驱动
//! - **Mock 后端**: 可编排状态的内存实现，用于测试轮询与重试逻辑
//!
//! ## 模块结构
//! - `traits`: 驱动层核心 trait 定义
//! - `cdp`: CDP 后端实现
//! - `mock`: 测试用 Mock 实现

pub mod cdp;
pub mod mock;
pub mod traits;

pub use cdp::CdpDriver;
pub use mock::{MockBrowser, MockDriver, MockElement, MockPage};
pub use traits::{
    BrowserDriver, BrowserHandle, ElementHandle, LaunchOptions, LoadState, PageHandle,
};

//! # 会话生命周期管理
//!
//! 为每个测试提供一个隔离的浏览器会话，并保证无论测试结果如何都完成清理。
//!
//! ## 主要功能
//! - **资源隔离**: 每个会话独占一个临时配置目录与随机调试端口
//! - **设备仿真**: 按设备档案设置视口尺寸与 User-Agent
//! - **启动错峰**: 并发启动前随机延迟，避免同时抢占系统资源
//! - **保证清理**: 关闭浏览器、删除临时目录、等待资源回收
//! - **进程清扫**: 兜底清理泄漏的浏览器进程
//!
//! ## 核心概念
//! - **SessionManager**: 会话生命周期管理器，通过注入的驱动启动浏览器
//! - **Session**: 一个隔离的会话，持有浏览器、初始页面与临时目录
//! - **SessionConfig**: 单次启动计划，端口与目录均为随机生成
//!
//! ## 模块结构
//! - `manager`: 会话管理器与会话句柄实现
//! - `sweep`: 泄漏进程的兜底清扫
//!
//! ## 使用示例
//! ```rust,no_run
//! use std::sync::Arc;
//! use webrig::config::Config;
//! use webrig::driver::CdpDriver;
//! use webrig::session::SessionManager;
//!
//! # async fn example() -> Result<(), webrig::Error> {
//! let config = Config::from_env()?;
//! let manager = SessionManager::new(Arc::new(CdpDriver::new()), config.clone());
//!
//! let title = manager
//!     .scoped("mobile", true, config.model.clone(), |session| async move {
//!         let interactor = session.interactor();
//!         interactor.open_url("https://example.com").await?;
//!         interactor.wait_for_page_loaded().await?;
//!         session.page().title().await
//!     })
//!     .await?;
//! println!("Page title: {}", title);
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod sweep;


pub use manager::{Session, SessionConfig, SessionManager};
pub use sweep::sweep;

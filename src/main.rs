//! # Webrig 冒烟入口
//!
//! Webrig 会话治具的冒烟程序：启动一个隔离的 Chromium 会话，打开目标页面，
//! 读取标题后完成清理。用于验证浏览器环境与治具本身是否就绪。
//!
//! ## 主要功能
//! - 初始化日志与配置
//! - 通过 CDP 驱动启动一个隔离会话（独立临时目录 + 随机调试端口）
//! - 打开命令行给定的 URL 并等待页面加载完成
//! - 无论成功失败都释放会话，并兜底清扫泄漏的浏览器进程
//!
//! ## 环境变量
//! - `WEBRIG_BROWSER_PATH`: 浏览器可执行文件路径（默认: 自动探测）
//! - `WEBRIG_DEVICE`: 仿真设备名（默认: desktop）
//! - `WEBRIG_HEADLESS`: 是否无头运行（默认: true）
//! - `WEBRIG_DEBUG_PORT_BASE` / `WEBRIG_DEBUG_PORT_SPREAD`: 调试端口基数与随机范围
//! - `WEBRIG_SCRATCH_DIR`: 临时配置目录的父目录（默认: 系统临时目录）
//! - `WEBRIG_WORKER`: 并发 worker 标识，设置后采用更长的启动错峰
//! - `RUST_LOG`: 日志级别（默认: info）

use std::sync::Arc;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use webrig::config::Config;
use webrig::driver::CdpDriver;
use webrig::session::{sweep, SessionManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Webrig v{}", webrig::VERSION);

    let config = Config::from_env()?;
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());
    info!(
        "Configuration loaded: device={}, headless={}",
        config.device, config.headless
    );

    let manager = SessionManager::new(Arc::new(CdpDriver::new()), config.clone());

    let outcome = manager
        .scoped(&config.device, config.headless, config.model.clone(), |session| {
            let url = url.clone();
            async move {
                info!(
                    "Session {} up on port {} ({})",
                    session.id(),
                    session.debug_port(),
                    session.device().name
                );

                let interactor = session.interactor();
                interactor.open_url(&url).await?;
                interactor.wait_for_page_loaded().await?;
                session.page().title().await
            }
        })
        .await;

    match &outcome {
        Ok(title) => info!("Loaded {} -> title {:?}", url, title),
        Err(e) => warn!("Smoke run failed: {}", e),
    }

    // Backstop against browser processes that outlived the session.
    sweep().await;

    outcome.map(|_| ()).map_err(Into::into)
}

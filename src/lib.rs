//! Webrig: browser session harness for end-to-end web testing
//!
//! Provisions isolated Chromium sessions over the Chrome DevTools Protocol and
//! drives page elements with bounded, polling-based interactions.

pub mod config;
pub mod devices;
pub mod driver;
pub mod element;
pub mod error;
pub mod poll;
pub mod session;

// Re-exports
pub use error::{Error, Result};

/// Webrig library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

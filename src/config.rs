//! Configuration management for Webrig

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Model configuration for the AI act primitive
///
/// The act-resolution mechanism itself is external; the harness only carries
/// the model identity, its API key, and the resolver endpoint to delegate to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name passed to the act resolver
    pub model_name: String,

    /// API key for the act resolver
    pub model_api_key: Option<String>,

    /// Act resolver endpoint URL; `act` fails with a configuration error
    /// when unset
    pub act_endpoint: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "gpt-5-nano".to_string(),
            model_api_key: None,
            act_endpoint: None,
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Browser executable path (falls back to `chromium` on PATH)
    pub browser_path: Option<String>,

    /// Device profile name used for sessions
    pub device: String,

    /// Run the browser headless
    pub headless: bool,

    /// Base port for the DevTools endpoint
    pub debug_port_base: u16,

    /// Random offset range added to the base port
    pub debug_port_spread: u16,

    /// Default timeout for waiting operations in milliseconds
    pub default_timeout: u64,

    /// Timeout for individual CDP commands in milliseconds
    pub command_timeout: u64,

    /// Budget for the browser process to become ready in milliseconds
    pub launch_timeout: u64,

    /// Settle delay after releasing a session in milliseconds
    pub settle_delay: u64,

    /// Directory scratch profiles are created under (system temp when unset)
    pub scratch_root: Option<PathBuf>,

    /// Parallel worker identity, when running as one of several workers
    pub worker_id: Option<String>,

    /// Model configuration for act delegation
    pub model: ModelConfig,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_path: None,
            device: "desktop".to_string(),
            headless: true,
            debug_port_base: 9222,
            debug_port_spread: 1000,
            default_timeout: 30000,
            command_timeout: 30000,
            launch_timeout: 30000,
            settle_delay: 1000,
            scratch_root: None,
            worker_id: None,
            model: ModelConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(browser_path) = env::var("WEBRIG_BROWSER_PATH") {
            config.browser_path = Some(browser_path);
        }

        if let Ok(device) = env::var("WEBRIG_DEVICE") {
            config.device = device;
        }

        if let Ok(headless) = env::var("WEBRIG_HEADLESS") {
            config.headless = headless
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBRIG_HEADLESS"))?;
        }

        if let Ok(base) = env::var("WEBRIG_DEBUG_PORT_BASE") {
            config.debug_port_base = base
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBRIG_DEBUG_PORT_BASE"))?;
        }

        if let Ok(spread) = env::var("WEBRIG_DEBUG_PORT_SPREAD") {
            config.debug_port_spread = spread
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBRIG_DEBUG_PORT_SPREAD"))?;
        }

        if let Ok(default_timeout) = env::var("WEBRIG_DEFAULT_TIMEOUT") {
            config.default_timeout = default_timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBRIG_DEFAULT_TIMEOUT"))?;
        }

        if let Ok(command_timeout) = env::var("WEBRIG_COMMAND_TIMEOUT") {
            config.command_timeout = command_timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBRIG_COMMAND_TIMEOUT"))?;
        }

        if let Ok(launch_timeout) = env::var("WEBRIG_LAUNCH_TIMEOUT") {
            config.launch_timeout = launch_timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBRIG_LAUNCH_TIMEOUT"))?;
        }

        if let Ok(settle_delay) = env::var("WEBRIG_SETTLE_DELAY") {
            config.settle_delay = settle_delay
                .parse()
                .map_err(|_| Error::configuration("Invalid WEBRIG_SETTLE_DELAY"))?;
        }

        if let Ok(scratch_root) = env::var("WEBRIG_SCRATCH_DIR") {
            config.scratch_root = Some(PathBuf::from(scratch_root));
        }

        if let Ok(worker_id) = env::var("WEBRIG_WORKER") {
            if !worker_id.is_empty() {
                config.worker_id = Some(worker_id);
            }
        }

        if let Ok(model_name) = env::var("WEBRIG_MODEL") {
            config.model.model_name = model_name;
        }

        if let Ok(api_key) = env::var("WEBRIG_MODEL_API_KEY") {
            config.model.model_api_key = Some(api_key);
        } else if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            config.model.model_api_key = Some(api_key);
        }

        if let Ok(endpoint) = env::var("WEBRIG_ACT_ENDPOINT") {
            config.model.act_endpoint = Some(endpoint);
        }

        if let Ok(log_level) = env::var("WEBRIG_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }
}

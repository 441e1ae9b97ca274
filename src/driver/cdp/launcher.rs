//! Chromium process launcher
//!
//! Spawns a Chromium with a dedicated profile directory and remote debugging
//! port, then polls the DevTools HTTP endpoint until the browser is ready to
//! accept connections.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::traits::LaunchOptions;
use crate::error::{Error, Result};
use crate::poll::poll_until;

/// Flags passed to every launched browser
///
/// Chosen for stable unattended runs: no sandbox surprises in containers, no
/// background throttling that stalls timers, no first-run or translation
/// prompts stealing focus.
pub const STABILITY_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-web-security",
    "--disable-features=VizDisplayCompositor",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-extensions",
    "--disable-plugins",
    "--disable-default-apps",
    "--disable-sync",
    "--disable-translate",
    "--disable-component-extensions-with-background-pages",
    "--memory-pressure-off",
    "--max_old_space_size=4096",
    "--disable-background-networking",
    "--disable-client-side-phishing-detection",
    "--disable-hang-monitor",
    "--disable-prompt-on-repost",
    "--disable-domain-reliability",
    "--disable-features=TranslateUI",
    "--disable-ipc-flooding-protection",
    "--disable-blink-features=AutomationControlled",
];

/// Executable names tried when no path is configured
const EXECUTABLE_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// Interval between DevTools readiness probes
const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A spawned browser process with its DevTools endpoints
#[derive(Debug)]
pub struct LaunchedBrowser {
    /// The browser child process
    pub child: Arc<Mutex<Child>>,
    /// Browser-level WebSocket URL from /json/version
    pub browser_ws_url: String,
    /// DevTools HTTP endpoint, e.g. "http://127.0.0.1:9345"
    pub http_endpoint: String,
}

/// Chromium process launcher
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    http: reqwest::Client,
}

impl ChromiumLauncher {
    /// Create a new launcher
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Launch a browser and wait until DevTools answers
    ///
    /// The child is spawned with kill-on-drop so an abandoned handle cannot
    /// leave the process behind. Launch failures kill the child before
    /// returning.
    pub async fn launch(&self, options: &LaunchOptions) -> Result<LaunchedBrowser> {
        let args = Self::build_args(options);

        let child = self.spawn(options, &args)?;
        let child = Arc::new(Mutex::new(child));

        let http_endpoint = format!("http://127.0.0.1:{}", options.debug_port);
        let launch_timeout = Duration::from_millis(options.launch_timeout);

        match self.wait_ready(&http_endpoint, &child, launch_timeout).await {
            Ok(browser_ws_url) => {
                info!(
                    "Browser ready on port {} ({})",
                    options.debug_port, browser_ws_url
                );
                Ok(LaunchedBrowser {
                    child,
                    browser_ws_url,
                    http_endpoint,
                })
            }
            Err(e) => {
                let mut guard = child.lock().await;
                if let Err(kill_err) = guard.kill().await {
                    warn!("Failed to kill browser after launch error: {}", kill_err);
                }
                Err(e)
            }
        }
    }

    /// Assemble the full command line for the given options
    fn build_args(options: &LaunchOptions) -> Vec<String> {
        let mut args = Vec::with_capacity(STABILITY_ARGS.len() + 6);

        args.push(format!("--remote-debugging-port={}", options.debug_port));
        if let Some(dir) = &options.user_data_dir {
            args.push(format!("--user-data-dir={}", dir.display()));
        }
        args.push(format!(
            "--window-size={},{}",
            options.window_width, options.window_height
        ));

        args.extend(STABILITY_ARGS.iter().map(|a| (*a).to_string()));

        if options.headless {
            args.push("--headless=new".to_string());
        }

        args.extend(options.args.iter().cloned());
        args
    }

    /// Spawn the browser process
    ///
    /// Uses the configured executable when set, otherwise walks the candidate
    /// list until one spawns.
    fn spawn(&self, options: &LaunchOptions, args: &[String]) -> Result<Child> {
        if let Some(path) = &options.executable_path {
            return Self::spawn_executable(Path::new(path), args).map_err(|e| {
                Error::launch(format!("Failed to start browser at {}: {}", path, e))
            });
        }

        for candidate in EXECUTABLE_CANDIDATES {
            match Self::spawn_executable(Path::new(candidate), args) {
                Ok(child) => {
                    debug!("Spawned browser executable: {}", candidate);
                    return Ok(child);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::launch(format!(
                        "Failed to start browser {}: {}",
                        candidate, e
                    )))
                }
            }
        }

        Err(Error::launch(
            "No Chromium executable found; set WEBRIG_BROWSER_PATH",
        ))
    }

    fn spawn_executable(path: &Path, args: &[String]) -> std::io::Result<Child> {
        Command::new(path)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
    }

    /// Poll /json/version until the browser answers or the budget runs out
    ///
    /// A child that exits during startup fails the wait immediately instead
    /// of burning the rest of the budget.
    async fn wait_ready(
        &self,
        http_endpoint: &str,
        child: &Arc<Mutex<Child>>,
        timeout: Duration,
    ) -> Result<String> {
        let version_url = format!("{}/json/version", http_endpoint);

        let outcome = poll_until(timeout, READY_POLL_INTERVAL, || {
            let client = self.http.clone();
            let url = version_url.clone();
            let child = Arc::clone(child);
            async move {
                if let Ok(mut guard) = child.try_lock() {
                    match guard.try_wait() {
                        Ok(Some(status)) => {
                            return Some(Err(Error::launch(format!(
                                "Browser exited during startup: {}",
                                status
                            ))))
                        }
                        Ok(None) => {}
                        Err(e) => {
                            return Some(Err(Error::launch(format!(
                                "Failed to poll browser process: {}",
                                e
                            ))))
                        }
                    }
                }

                let response = match client.get(&url).send().await {
                    Ok(response) if response.status().is_success() => response,
                    _ => return None,
                };

                match response.json::<serde_json::Value>().await {
                    Ok(version) => version
                        .get("webSocketDebuggerUrl")
                        .and_then(|v| v.as_str())
                        .map(|s| Ok(s.to_string())),
                    Err(_) => None,
                }
            }
        })
        .await;

        match outcome {
            Some(Ok(ws_url)) => Ok(ws_url),
            Some(Err(e)) => Err(e),
            None => Err(Error::launch(format!(
                "Browser did not expose DevTools at {} within {:?}",
                http_endpoint, timeout
            ))),
        }
    }
}

impl Default for ChromiumLauncher {
    fn default() -> Self {
        Self::new()
    }
}

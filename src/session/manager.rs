//! Session lifecycle manager
//!
//! Provisions one isolated browser session per test and guarantees teardown.
//! Every session gets its own scratch profile directory and a randomized
//! debug port, so concurrently running tests never share browser state.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{Config, ModelConfig};
use crate::devices::{self, DeviceProfile};
use crate::driver::mock::MockDriver;
use crate::driver::traits::{BrowserDriver, BrowserHandle, LaunchOptions, PageHandle};
use crate::element::ElementInteractor;
use crate::error::Result;

/// Scratch directory prefix, shared with the process sweep patterns
const SCRATCH_PREFIX: &str = "webrig";

/// Startup stagger bounds in milliseconds when running as a parallel worker
const WORKER_STAGGER_MS: (u64, u64) = (500, 2000);

/// Startup stagger bounds in milliseconds for a sole run
const SOLO_STAGGER_MS: (u64, u64) = (100, 300);

/// Ephemeral launch plan for one session
///
/// Built fresh for every acquire and never reused, so scratch directories and
/// debug ports cannot collide across tests running in parallel.
#[derive(Debug)]
pub struct SessionConfig {
    /// Emulated device
    pub device: DeviceProfile,
    /// Headless flag for the launch
    pub headless: bool,
    /// Randomized DevTools port
    pub debug_port: u16,
    /// Private profile directory, removed at release
    scratch: TempDir,
}

impl SessionConfig {
    /// Path of the scratch profile directory
    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }
}

/// One isolated browser automation session
///
/// Owns a browser, its initial page, and a scratch profile directory. Clones
/// share the same underlying session, so the scoped combinator can hand one
/// to the test body and still release the session afterwards.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: String,
    device: DeviceProfile,
    debug_port: u16,
    scratch_path: PathBuf,
    /// Taken at release; dropping it is the backstop when release never runs
    scratch: Mutex<Option<TempDir>>,
    browser: Arc<dyn BrowserHandle>,
    page: Arc<dyn PageHandle>,
    default_timeout: Duration,
    started_at: DateTime<Utc>,
    released: AtomicBool,
}

impl Session {
    /// Session ID
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Device profile the session emulates
    pub fn device(&self) -> DeviceProfile {
        self.inner.device
    }

    /// DevTools port the browser was launched on
    pub fn debug_port(&self) -> u16 {
        self.inner.debug_port
    }

    /// Path of the scratch profile directory
    pub fn scratch_path(&self) -> &Path {
        &self.inner.scratch_path
    }

    /// Owning browser handle
    pub fn browser(&self) -> Arc<dyn BrowserHandle> {
        Arc::clone(&self.inner.browser)
    }

    /// Initial page handle
    pub fn page(&self) -> Arc<dyn PageHandle> {
        Arc::clone(&self.inner.page)
    }

    /// When the session became ready
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Whether the session has been released
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    /// Build an element interactor over the session's initial page
    pub fn interactor(&self) -> ElementInteractor {
        ElementInteractor::new(self.browser(), self.page(), self.inner.default_timeout)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("device", &self.inner.device.name)
            .field("debug_port", &self.inner.debug_port)
            .field("scratch_path", &self.inner.scratch_path)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Session lifecycle manager
///
/// Validates the requested device, plans unique per-session resources,
/// launches the browser through the injected driver, and releases everything
/// on both success and failure paths.
pub struct SessionManager {
    driver: Arc<dyn BrowserDriver>,
    config: Config,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(driver: Arc<dyn BrowserDriver>, config: Config) -> Self {
        Self { driver, config }
    }

    /// Create a session manager backed by the mock driver for testing
    pub fn mock() -> Self {
        Self::new(Arc::new(MockDriver::new()), Config::default())
    }

    /// Configuration the manager was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Acquire an isolated session
    ///
    /// Validates the device name, plans a fresh scratch directory and debug
    /// port, staggers the start, then launches and attaches. Initialization
    /// failures surface after best-effort cleanup of the partial session;
    /// a failed launch (for example a port collision) is left to the caller
    /// to retry, since ports are drawn randomly rather than reserved.
    #[instrument(skip(self, model))]
    pub async fn acquire(
        &self,
        device_name: &str,
        headless: bool,
        model: ModelConfig,
    ) -> Result<Session> {
        let plan = self.prepare(device_name, headless)?;
        self.stagger().await;

        info!(
            "Launching {} session on port {} (profile {})",
            plan.device.name,
            plan.debug_port,
            plan.scratch_path().display()
        );

        let options = self.launch_options(&plan, model);
        let browser = match self.driver.launch(options).await {
            Ok(browser) => browser,
            Err(e) => {
                warn!("Session launch failed: {}", e);
                Self::discard_scratch(plan.scratch);
                return Err(e);
            }
        };

        let page = match Self::initial_page(&browser).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Session initialization failed: {}", e);
                if let Err(close_err) = browser.close().await {
                    warn!("Closing half-initialized browser: {}", close_err);
                }
                Self::discard_scratch(plan.scratch);
                return Err(e);
            }
        };

        let session = Session {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4().to_string(),
                device: plan.device,
                debug_port: plan.debug_port,
                scratch_path: plan.scratch_path().to_path_buf(),
                scratch: Mutex::new(Some(plan.scratch)),
                browser,
                page,
                default_timeout: Duration::from_millis(self.config.default_timeout),
                started_at: Utc::now(),
                released: AtomicBool::new(false),
            }),
        };

        debug!("Session {} ready", session.id());
        Ok(session)
    }

    /// Release a session
    ///
    /// Runs the teardown in a fixed order: close the browser (close errors
    /// are logged, never raised, so they cannot mask the test outcome),
    /// remove the scratch directory best-effort, then pause briefly so the
    /// OS reclaims process and file handles before the next session starts.
    /// Releasing an already-released session is a no-op.
    #[instrument(skip(self, session), fields(session = %session.id()))]
    pub async fn release(&self, session: &Session) {
        if session.inner.released.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = session.inner.browser.close().await {
            warn!("Closing browser for session {}: {}", session.id(), e);
        }

        let scratch = session
            .inner
            .scratch
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(scratch) = scratch {
            Self::discard_scratch(scratch);
        }

        tokio::time::sleep(Duration::from_millis(self.config.settle_delay)).await;

        let uptime = (Utc::now() - session.started_at()).num_seconds();
        debug!("Session {} released after {}s", session.id(), uptime);
    }

    /// Run a body with a session that is always released
    ///
    /// The body receives a clone of the session; release runs whether the
    /// body returns Ok or Err, mirroring fixture teardown in a test harness.
    pub async fn scoped<T, F, Fut>(
        &self,
        device_name: &str,
        headless: bool,
        model: ModelConfig,
        body: F,
    ) -> Result<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = self.acquire(device_name, headless, model).await?;
        let outcome = body(session.clone()).await;
        self.release(&session).await;
        outcome
    }

    /// Plan the per-session resources
    ///
    /// The debug port is the configured base plus a random offset and the
    /// scratch directory carries a random four-digit tag; both ranges are
    /// wide enough that concurrent sessions collide only with negligible
    /// probability.
    fn prepare(&self, device_name: &str, headless: bool) -> Result<SessionConfig> {
        let device = devices::lookup(device_name)?;

        let (debug_port, scratch_tag) = {
            let mut rng = rand::thread_rng();
            (
                self.config.debug_port_base + rng.gen_range(0..=self.config.debug_port_spread),
                rng.gen_range(1000u32..=9999),
            )
        };

        let prefix = format!("{}_{}_", SCRATCH_PREFIX, scratch_tag);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let scratch = match &self.config.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        Ok(SessionConfig {
            device,
            headless,
            debug_port,
            scratch,
        })
    }

    /// Randomized pause before a launch
    ///
    /// Concurrent workers spawning browsers at the same instant contend on
    /// process creation, memory, and disk; parallel runs wait longer than
    /// sole runs.
    async fn stagger(&self) {
        let (low, high) = if self.config.worker_id.is_some() {
            WORKER_STAGGER_MS
        } else {
            SOLO_STAGGER_MS
        };

        let delay = {
            let mut rng = rand::thread_rng();
            Duration::from_millis(rng.gen_range(low..=high))
        };

        match &self.config.worker_id {
            Some(worker) => debug!("Worker {}: staggering launch by {:?}", worker, delay),
            None => debug!("Staggering launch by {:?}", delay),
        }

        tokio::time::sleep(delay).await;
    }

    /// Assemble launch options from the plan and the harness configuration
    ///
    /// Viewport and user agent come from the device profile; the stability
    /// flag set is contributed by the driver's launcher.
    fn launch_options(&self, plan: &SessionConfig, model: ModelConfig) -> LaunchOptions {
        LaunchOptions {
            headless: plan.headless,
            window_width: plan.device.width,
            window_height: plan.device.height,
            user_agent: Some(plan.device.user_agent.to_string()),
            args: vec![],
            executable_path: self.config.browser_path.clone(),
            debug_port: plan.debug_port,
            user_data_dir: Some(plan.scratch_path().to_path_buf()),
            launch_timeout: self.config.launch_timeout,
            command_timeout: self.config.command_timeout,
            model,
        }
    }

    /// First page of a freshly launched browser
    ///
    /// Browsers normally open with one blank page; a backend that starts
    /// empty gets one created.
    async fn initial_page(browser: &Arc<dyn BrowserHandle>) -> Result<Arc<dyn PageHandle>> {
        if let Some(page) = browser.pages().await?.into_iter().next() {
            return Ok(page);
        }
        browser.new_page("about:blank").await
    }

    /// Best-effort removal of a scratch directory
    fn discard_scratch(scratch: TempDir) {
        let path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(
                "Could not remove scratch directory {}: {}",
                path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_prepare_validates_device_first() {
        let manager = SessionManager::mock();
        let err = manager.prepare("smartwatch", true).unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }

    #[test]
    fn test_prepare_randomizes_ports_within_range() {
        let manager = SessionManager::mock();
        let mut ports = HashSet::new();
        let mut paths = HashSet::new();

        for _ in 0..100 {
            let plan = manager.prepare("desktop", true).unwrap();
            assert!((9222..=10222).contains(&plan.debug_port));
            ports.insert(plan.debug_port);
            paths.insert(plan.scratch_path().to_path_buf());
        }

        // Ports are drawn from 1001 values; 100 draws landing on a single
        // value would mean the range is not being sampled at all.
        assert!(ports.len() > 1);
        assert_eq!(paths.len(), 100);
    }

    #[test]
    fn test_prepare_tags_scratch_directories() {
        let manager = SessionManager::mock();
        let plan = manager.prepare("desktop", true).unwrap();

        let name = plan
            .scratch_path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .to_string();
        assert!(name.starts_with("webrig_"));

        let tag: u32 = name.split('_').nth(1).unwrap().parse().unwrap();
        assert!((1000..=9999).contains(&tag));
        assert!(plan.scratch_path().is_dir());
    }

    #[test]
    fn test_prepare_honors_scratch_root() {
        let root = tempfile::tempdir().unwrap();
        let config = Config {
            scratch_root: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        let manager = SessionManager::new(Arc::new(MockDriver::new()), config);

        let plan = manager.prepare("desktop", true).unwrap();
        assert_eq!(plan.scratch_path().parent(), Some(root.path()));
    }

    #[test]
    fn test_launch_options_carry_device_and_plan() {
        let manager = SessionManager::mock();
        let plan = manager.prepare("mobile", false).unwrap();
        let options = manager.launch_options(&plan, ModelConfig::default());

        assert_eq!(options.window_width, 430);
        assert_eq!(options.window_height, 932);
        assert!(options.user_agent.unwrap().contains("iPhone"));
        assert!(!options.headless);
        assert_eq!(options.debug_port, plan.debug_port);
        assert_eq!(
            options.user_data_dir.as_deref(),
            Some(plan.scratch_path())
        );
        assert_eq!(options.command_timeout, 30000);
    }
}

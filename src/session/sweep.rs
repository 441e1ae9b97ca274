//! End-of-run process sweep
//!
//! Crashed sessions can leave browser processes behind even though release
//! and kill-on-drop normally reap them. The sweep runs once after a whole
//! test run and force-terminates anything whose command line still mentions
//! a session scratch directory. It matches by name rather than by session
//! ownership, so it must only run when every session is expected closed.

use std::time::Duration;
use tracing::debug;

#[cfg(unix)]
use tracing::warn;

/// Command-line patterns identifying leaked session processes
///
/// Every launched browser carries `--user-data-dir=<scratch>` with the
/// `webrig_` prefix in its command line, as do its forked helpers.
#[cfg(unix)]
const SWEEP_PATTERNS: &[&str] = &["chromium.*webrig_", "chrome.*webrig_", "webrig_"];

/// Budget for a single pkill invocation
#[cfg(unix)]
const PKILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after the sweep so terminated processes are reaped
const SWEEP_SETTLE: Duration = Duration::from_secs(1);

/// Force-terminate lingering browser processes from this run
///
/// Best-effort on every level: a pattern that matches nothing, a pkill that
/// fails, or a pkill that hangs past its budget are all logged and ignored.
/// Unix-only; elsewhere the sweep is a no-op.
pub async fn sweep() {
    #[cfg(unix)]
    for pattern in SWEEP_PATTERNS {
        let pkill = tokio::process::Command::new("pkill")
            .arg("-f")
            .arg(pattern)
            .status();

        match tokio::time::timeout(PKILL_TIMEOUT, pkill).await {
            Ok(Ok(status)) => debug!("Swept '{}': {}", pattern, status),
            Ok(Err(e)) => warn!("Sweep of '{}' failed: {}", pattern, e),
            Err(_) => warn!("Sweep of '{}' did not finish within {:?}", pattern, PKILL_TIMEOUT),
        }
    }

    #[cfg(not(unix))]
    debug!("Process sweep is unix-only; skipping");

    tokio::time::sleep(SWEEP_SETTLE).await;
}

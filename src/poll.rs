//! Bounded polling utility
//!
//! Every waiting operation in this crate (element state waits, value waits,
//! window switching, clear retries, endpoint readiness) is the same shape:
//! probe a condition, sleep an interval, give up after a budget. This module
//! provides that shape once instead of one ad hoc sleep loop per call site.

use std::future::Future;
use std::time::{Duration, Instant};

/// Poll `probe` until it yields a value or `timeout` elapses
///
/// The probe runs first, so a caller with a zero budget still gets exactly one
/// probe, and success is returned as soon as a probe yields — never before.
/// Returns `None` once the budget is exhausted; the caller decides what
/// failure means (typed timeout, boolean, best-effort log).
///
/// Probes are expected to swallow their own transient errors and report
/// "not yet" by returning `None`.
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();

    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }

        if start.elapsed() >= timeout {
            return None;
        }

        tokio::time::sleep(interval).await;
    }
}

//! Clock helpers.
//!
//! Readiness is measured with `tokio::time::Instant` so a paused test runtime
//! drives job timing deterministically.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use tokio::time::Instant;

/// Current monotonic instant used for ready-time computation.
#[must_use]
pub fn now() -> Instant {
    Instant::now()
}

/// Ready time used when `now + delay` is not representable (roughly 30 years).
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, clamped to [`FAR_FUTURE`] instead of overflowing.
#[must_use]
pub fn ready_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Wall-clock milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

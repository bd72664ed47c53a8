//! Host-environment collaborators: the one-shot timer and the dispatch primitive.
//!
//! The scheduler never polls. It arms a single timer for the next wake time and
//! hands fire-and-forget work (cancellation handlers) to a [`Spawn`] implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed, sendable unit future.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Callback run when an armed timer fires. The returned future is driven to
/// completion by the timer implementation.
pub type TimerCallback = Box<dyn FnOnce() -> BoxFuture + Send + 'static>;

/// Schedule-once-after-delay primitive.
pub trait Timer: Send + Sync {
    /// Arm a one-shot timer. `on_fire` runs once after `delay` unless the
    /// returned handle is cancelled first.
    fn arm_once(&self, delay: Duration, on_fire: TimerCallback) -> Box<dyn TimerHandle>;
}

/// Handle to an armed timer.
pub trait TimerHandle: Send {
    /// Disarm the timer. A no-op once the timer has fired.
    fn cancel(self: Box<Self>);
}

/// Abstraction for spawning fire-and-forget work on the host's dispatch context.
pub trait Spawn: Send + Sync {
    /// Spawn a future; its completion is not observed.
    fn spawn(&self, fut: BoxFuture);
}

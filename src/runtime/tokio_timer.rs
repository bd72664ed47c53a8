//! One-shot timer on the tokio runtime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::core::{SchedulerError, Timer, TimerCallback, TimerHandle};

/// [`Timer`] backed by `tokio::time::sleep` on a spawned task.
#[derive(Clone)]
pub struct TokioTimer {
    handle: Arc<tokio::runtime::Handle>,
}

impl TokioTimer {
    /// Timer spawning onto `handle`.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Timer bound to the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NoRuntime`] outside a tokio runtime.
    pub fn current() -> Result<Self, SchedulerError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|_| SchedulerError::NoRuntime)
    }
}

impl Timer for TokioTimer {
    fn arm_once(&self, delay: Duration, on_fire: TimerCallback) -> Box<dyn TimerHandle> {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.handle.spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => on_fire().await,
                _ = cancel_rx => {}
            }
        });
        Box::new(TokioTimerHandle { cancel: cancel_tx })
    }
}

/// Armed [`TokioTimer`]. Dropping it disarms the timer as well.
pub struct TokioTimerHandle {
    cancel: oneshot::Sender<()>,
}

impl TimerHandle for TokioTimerHandle {
    fn cancel(self: Box<Self>) {
        let _ = self.cancel.send(());
    }
}

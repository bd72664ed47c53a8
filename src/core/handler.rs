//! Handler abstraction.
//!
//! The scheduler consumes four handler shapes: plain (`Fn() -> R`), stepped
//! (`Fn(is_first_step) -> (R, done)`), their async counterparts, a pre-handler
//! gate and a completion callback. All of them are normalised into one
//! [`StepFn`] that is always awaited, so the dispatch loop treats synchronous
//! and suspending handlers identically.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::result::JobResult;

/// Future produced by one handler invocation.
pub type StepFuture<R> = Pin<Box<dyn Future<Output = (R, bool)> + Send>>;

/// Normalised handler: receives `is_first_step`, yields `(result, completed)`.
pub type StepFn<R> = Arc<dyn Fn(bool) -> StepFuture<R> + Send + Sync>;

/// Gate evaluated before every invocation; returning `false` vetoes the run.
pub type PreHandler = Arc<dyn Fn() -> bool + Send + Sync>;

/// Callback receiving the raw result of a job's final invocation.
pub type Completion<R> = Box<dyn FnOnce(R) + Send + 'static>;

/// Deferred side effect run after the scheduler lock is released.
pub(crate) type Deferred = Box<dyn FnOnce() + Send + 'static>;

/// Wrap a plain synchronous handler.
pub fn plain<R, F>(handler: F) -> StepFn<R>
where
    R: JobResult,
    F: Fn() -> R + Send + Sync + 'static,
{
    Arc::new(move |_first: bool| -> StepFuture<R> {
        let result = handler();
        Box::pin(async move { (result, true) })
    })
}

/// Wrap a synchronous step handler.
pub fn stepped<R, F>(handler: F) -> StepFn<R>
where
    R: JobResult,
    F: Fn(bool) -> (R, bool) + Send + Sync + 'static,
{
    Arc::new(move |first: bool| -> StepFuture<R> {
        let outcome = handler(first);
        Box::pin(async move { outcome })
    })
}

/// Wrap an async handler producing a final result.
pub fn plain_async<R, F, Fut>(handler: F) -> StepFn<R>
where
    R: JobResult,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    Arc::new(move |_first: bool| -> StepFuture<R> {
        let fut = handler();
        Box::pin(async move { (fut.await, true) })
    })
}

/// Wrap an async step handler.
pub fn stepped_async<R, F, Fut>(handler: F) -> StepFn<R>
where
    R: JobResult,
    F: Fn(bool) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (R, bool)> + Send + 'static,
{
    Arc::new(move |first: bool| -> StepFuture<R> { Box::pin(handler(first)) })
}

/// What one invocation produced, with the result type erased.
pub(crate) struct RunOutcome {
    pub success: bool,
    pub completed: bool,
    /// Delivers the raw result to the completion callback. Only invoked on a
    /// terminal completion; dropped otherwise.
    pub deliver: Deferred,
}

/// Type-erased job body stored by the scheduler.
#[async_trait]
pub(crate) trait Runnable: Send + Sync {
    /// Invoke the handler once.
    async fn run(&self, is_first_step: bool) -> RunOutcome;
}

/// Typed job body: handler plus its completion callback.
pub(crate) struct JobRunner<R: JobResult> {
    handler: StepFn<R>,
    on_complete: Arc<Mutex<Option<Completion<R>>>>,
}

impl<R: JobResult> JobRunner<R> {
    pub(crate) fn new(handler: StepFn<R>, on_complete: Completion<R>) -> Self {
        Self {
            handler,
            on_complete: Arc::new(Mutex::new(Some(on_complete))),
        }
    }
}

#[async_trait]
impl<R: JobResult> Runnable for JobRunner<R> {
    async fn run(&self, is_first_step: bool) -> RunOutcome {
        let (result, completed) = (self.handler)(is_first_step).await;
        let success = result.is_success();
        let slot = Arc::clone(&self.on_complete);
        RunOutcome {
            success,
            completed,
            deliver: Box::new(move || {
                let callback = slot.lock().take();
                if let Some(callback) = callback {
                    callback(result);
                }
            }),
        }
    }
}

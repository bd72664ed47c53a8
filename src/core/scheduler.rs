//! Cooperative priority scheduler.
//!
//! At most one handler invocation is in flight at a time. Jobs are selected by
//! readiness and priority, retried on failure, continued step by step and
//! aggregated into groups. A single one-shot timer drives dispatch; every
//! mutation runs inside a stop/start pair so a burst of changes arms the timer
//! once.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::group::{GroupCounters, GroupOptions, GroupRecord};
use super::handler::{
    plain, plain_async, stepped, stepped_async, Completion, Deferred, JobRunner, StepFn,
};
use super::host::{BoxFuture, Spawn, Timer};
use super::job::{GroupHandle, Handle, JobHandle, JobOptions, JobRecord, Lifecycle};
use super::log_sink::LogSink;
use super::result::JobResult;
use super::state::{CancelOutcome, RunDisposition, SchedulerState};
use crate::builders::SchedulerBuilder;
use crate::config::SchedulerConfig;
use crate::util::clock::{now, Instant};
use crate::util::serde::{JobId, LogLevel, Priority};

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Jobs waiting in the queue, including those between retries or steps.
    pub queued_jobs: usize,
    /// Groups with outstanding members.
    pub queued_groups: usize,
    /// Holder of the Low/Medium running slot.
    pub running_job: Option<JobId>,
    /// Holder of the High running slot.
    pub running_high_priority_job: Option<JobId>,
    /// Current stop nesting depth.
    pub stop_count: u32,
    /// Whether a timer is armed right now.
    pub timer_armed: bool,
    /// Timers armed since creation.
    pub timer_arms: u64,
}

struct SchedulerInner {
    state: Mutex<SchedulerState>,
    config: SchedulerConfig,
    timer: Arc<dyn Timer>,
    spawner: Arc<dyn Spawn>,
    next_id: AtomicU64,
}

/// Handle to a scheduler. Cloning is cheap; clones share one queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Create a scheduler from explicit collaborators.
    pub fn new(
        config: SchedulerConfig,
        log_sink: Arc<dyn LogSink>,
        timer: Arc<dyn Timer>,
        spawner: Arc<dyn Spawn>,
    ) -> Self {
        tracing::debug!(?config, "creating scheduler");
        Self {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(SchedulerState::new(log_sink)),
                config,
                timer,
                spawner,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Start building a scheduler.
    #[must_use]
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    /// Configuration the scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    fn next_id(&self) -> JobId {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Adding work
    // ------------------------------------------------------------------

    /// Schedule a plain job. `on_complete` receives the result of the final
    /// invocation once the job completes; it is not called on cancellation.
    pub fn add_job<R, F, C>(
        &self,
        description: impl Into<String>,
        options: JobOptions,
        handler: F,
        on_complete: C,
    ) -> JobHandle
    where
        R: JobResult,
        F: Fn() -> R + Send + Sync + 'static,
        C: FnOnce(R) + Send + 'static,
    {
        self.add_runnable(
            description.into(),
            options,
            plain(handler),
            Box::new(on_complete),
            false,
        )
    }

    /// Schedule a stepped job. The handler receives `is_first_step` and
    /// returns `(result, completed)`; a successful, incomplete step is
    /// continued ahead of everything else in the queue.
    pub fn add_stepped_job<R, F, C>(
        &self,
        description: impl Into<String>,
        options: JobOptions,
        handler: F,
        on_complete: C,
    ) -> JobHandle
    where
        R: JobResult,
        F: Fn(bool) -> (R, bool) + Send + Sync + 'static,
        C: FnOnce(R) + Send + 'static,
    {
        self.add_runnable(
            description.into(),
            options,
            stepped(handler),
            Box::new(on_complete),
            true,
        )
    }

    /// Schedule a job whose handler suspends. Nothing else runs until it resolves.
    pub fn add_async_job<R, F, Fut, C>(
        &self,
        description: impl Into<String>,
        options: JobOptions,
        handler: F,
        on_complete: C,
    ) -> JobHandle
    where
        R: JobResult,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        C: FnOnce(R) + Send + 'static,
    {
        self.add_runnable(
            description.into(),
            options,
            plain_async(handler),
            Box::new(on_complete),
            false,
        )
    }

    /// Schedule a stepped job whose handler suspends.
    pub fn add_async_stepped_job<R, F, Fut, C>(
        &self,
        description: impl Into<String>,
        options: JobOptions,
        handler: F,
        on_complete: C,
    ) -> JobHandle
    where
        R: JobResult,
        F: Fn(bool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (R, bool)> + Send + 'static,
        C: FnOnce(R) + Send + 'static,
    {
        self.add_runnable(
            description.into(),
            options,
            stepped_async(handler),
            Box::new(on_complete),
            true,
        )
    }

    fn add_runnable<R: JobResult>(
        &self,
        description: String,
        options: JobOptions,
        handler: StepFn<R>,
        on_complete: Completion<R>,
        is_stepped: bool,
    ) -> JobHandle {
        let config = &self.inner.config;
        let id = self.next_id();
        let priority = options.priority.unwrap_or(config.default_priority);
        let lifecycle = Arc::new(Lifecycle::default());
        let handle = JobHandle {
            id,
            priority,
            lifecycle: Arc::clone(&lifecycle),
        };

        let mut state = self.inner.state.lock();
        let attached = options
            .group
            .is_none_or(|group_id| state.attach_to_group(group_id));
        if !attached {
            drop(state);
            tracing::error!(
                job_id = id,
                group_id = ?options.group,
                "job `{description}` added to a closed group; dropped"
            );
            debug_assert!(attached, "job `{description}` added to a closed group");
            return handle;
        }

        let record = JobRecord {
            priority,
            delay: options.delay,
            ready_at: now(),
            run_count: 0,
            max_run_count: options.max_run_count.unwrap_or(config.max_run_count),
            rerun_delay: options.rerun_delay.unwrap_or_else(|| config.rerun_delay()),
            is_stepped,
            is_continuation_step: false,
            step_count: 0,
            group: options.group,
            log_level: options.log_level.unwrap_or(config.log_level),
            runnable: Arc::new(JobRunner::new(handler, on_complete)),
            pre_handler: options.pre_handler,
            lifecycle,
            description,
        };
        tracing::debug!(job_id = id, ?priority, delay = ?record.delay, "job scheduled");

        state.stop();
        state.add_job(id, record, now());
        self.start_locked(&mut state);
        handle
    }

    /// Create a group. `on_complete` runs once when the last member finishes,
    /// with `true` when no completed member failed.
    pub fn add_group<C>(
        &self,
        description: impl Into<String>,
        options: GroupOptions,
        on_complete: C,
    ) -> GroupHandle
    where
        C: FnOnce(bool) + Send + 'static,
    {
        let description = description.into();
        let id = self.next_id();
        let lifecycle = Arc::new(Lifecycle::default());
        let handle = GroupHandle {
            id,
            lifecycle: Arc::clone(&lifecycle),
        };

        let mut state = self.inner.state.lock();
        let attached = options
            .parent
            .is_none_or(|parent| state.attach_to_group(parent));
        if !attached {
            drop(state);
            tracing::error!(
                group_id = id,
                parent = ?options.parent,
                "group `{description}` added to a closed group; dropped"
            );
            debug_assert!(attached, "group `{description}` added to a closed group");
            return handle;
        }

        let record = GroupRecord {
            parent: options.parent,
            log_level: options.log_level.unwrap_or(self.inner.config.log_level),
            counters: GroupCounters::default(),
            started: false,
            on_complete: Some(Box::new(on_complete)),
            lifecycle,
            description,
        };
        tracing::debug!(group_id = id, parent = ?record.parent, "group created");

        state.stop();
        state.add_group(id, record);
        self.start_locked(&mut state);
        handle
    }

    /// Run `callback` once after `delay`, ahead of Low and Medium work.
    pub fn wait<F>(&self, callback: F, delay: Duration) -> JobHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let slot = Mutex::new(Some(callback));
        let options = JobOptions::new()
            .with_priority(self.inner.config.wait_priority)
            .with_delay(delay)
            .with_max_run_count(1)
            .with_log_level(LogLevel::Quiet);
        self.add_job(
            "wait",
            options,
            move || {
                let callback = slot.lock().take();
                if let Some(callback) = callback {
                    callback();
                }
            },
            |()| {},
        )
    }

    // ------------------------------------------------------------------
    // Cancellation and queries
    // ------------------------------------------------------------------

    /// Cancel a job or a whole group.
    ///
    /// Returns `true` when everything targeted was removed before running.
    /// A job that is executing is flagged instead and stops after its current
    /// invocation; the return is then `false`.
    pub fn cancel_job(&self, target: impl Into<Handle>) -> bool {
        self.cancel(&target.into(), None)
    }

    /// Like [`cancel_job`](Self::cancel_job), dispatching `on_cancel` once
    /// through the spawner when a targeted job was mid-execution.
    pub fn cancel_job_with<F>(&self, target: impl Into<Handle>, on_cancel: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel(&target.into(), Some(Box::new(on_cancel)))
    }

    fn cancel(&self, target: &Handle, on_cancel: Option<Deferred>) -> bool {
        let mut deferred = Vec::new();
        let outcome = {
            let mut state = self.inner.state.lock();
            state.stop();
            let outcome = match target {
                Handle::Job(job) => state.cancel_job(job.id, &mut deferred),
                Handle::Group(group) => state.cancel_group(group.id, &mut deferred),
            };
            self.start_locked(&mut state);
            outcome
        };
        tracing::debug!(id = target.id(), ?outcome, "cancel requested");
        run_deferred(deferred);

        match outcome {
            CancelOutcome::Cancelled => true,
            CancelOutcome::Cancelling => {
                if let Some(on_cancel) = on_cancel {
                    self.inner.spawner.spawn(Box::pin(async move { on_cancel() }));
                }
                false
            }
            CancelOutcome::NotFound => false,
        }
    }

    /// Whether the job or group is still waiting to reach a terminal state.
    #[must_use]
    pub fn is_pending(&self, target: impl Into<Handle>) -> bool {
        match target.into() {
            Handle::Job(job) => job.is_pending(),
            Handle::Group(group) => group.is_pending(),
        }
    }

    /// Whether the job or group ended cancelled.
    #[must_use]
    pub fn is_cancelled(&self, target: impl Into<Handle>) -> bool {
        match target.into() {
            Handle::Job(job) => job.is_cancelled(),
            Handle::Group(group) => group.is_cancelled(),
        }
    }

    /// Priority of a job.
    #[must_use]
    pub fn priority(&self, job: &JobHandle) -> Priority {
        job.priority()
    }

    /// Make a waiting job ready now. Returns `false` if the job is terminal.
    pub fn clear_delay(&self, job: &JobHandle) -> bool {
        let mut state = self.inner.state.lock();
        state.stop();
        let found = state.clear_delay(job.id, now());
        self.start_locked(&mut state);
        found
    }

    /// Member counters of a live group.
    #[must_use]
    pub fn group_counters(&self, group: &GroupHandle) -> Option<GroupCounters> {
        self.inner.state.lock().group_counters(group.id)
    }

    /// Snapshot of queue and timer state.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let state = self.inner.state.lock();
        let queued_jobs = state.queue.job_ids().count();
        SchedulerStats {
            queued_jobs,
            queued_groups: state.queue.len() - queued_jobs,
            running_job: state.slots.job,
            running_high_priority_job: state.slots.high_priority_job,
            stop_count: state.stop_count,
            timer_armed: state.timer.is_some(),
            timer_arms: state.timer_arms,
        }
    }

    // ------------------------------------------------------------------
    // Batching
    // ------------------------------------------------------------------

    /// Enter a batch: disarm the timer and hold dispatch until the matching
    /// [`start`](Self::start). Nests.
    pub fn stop(&self) {
        self.inner.state.lock().stop();
    }

    /// Leave a batch. When the outermost level is left the timer is armed
    /// for the next ready job.
    pub fn start(&self) {
        let mut state = self.inner.state.lock();
        self.start_locked(&mut state);
    }

    /// RAII form of [`stop`](Self::stop)/[`start`](Self::start).
    #[must_use = "the batch ends when the guard is dropped"]
    pub fn batch(&self) -> BatchGuard<'_> {
        self.stop();
        BatchGuard { scheduler: self }
    }

    fn start_locked(&self, state: &mut SchedulerState) {
        if let Some(wait) = state.start(now()) {
            self.arm(state, wait);
        }
    }

    fn arm(&self, state: &mut SchedulerState, wait: Duration) {
        let generation = state.timer_generation;
        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);
        let handle = self.inner.timer.arm_once(
            wait,
            Box::new(move || -> BoxFuture {
                Box::pin(async move {
                    if let Some(inner) = weak.upgrade() {
                        Scheduler { inner }.on_timer_fired(generation).await;
                    }
                })
            }),
        );
        state.install_timer(handle);
        tracing::trace!(?wait, generation, "timer armed");
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    async fn on_timer_fired(&self, generation: u64) {
        {
            let mut state = self.inner.state.lock();
            if state.timer_generation != generation {
                tracing::trace!(generation, "ignoring stale timer");
                return;
            }
            state.timer = None;
            debug_assert!(!state.dispatching, "dispatch loop re-entered");
            state.stop();
            state.dispatching = true;
        }

        let guard = DispatchGuard { scheduler: self };
        loop {
            let next = self.inner.state.lock().select_next(now());
            let Some(id) = next else {
                break;
            };
            self.run_job(id).await;
        }
        drop(guard);
    }

    async fn run_job(&self, id: JobId) {
        let prepared = self.inner.state.lock().begin_run(id);
        let Some(prepared) = prepared else {
            return;
        };

        if let Some(gate) = &prepared.pre_handler {
            if !gate() {
                let mut deferred = Vec::new();
                self.inner.state.lock().veto_run(id, &mut deferred);
                run_deferred(deferred);
                return;
            }
        }

        let outcome = prepared.runnable.run(prepared.is_first_step).await;
        let finished_at: Instant = now();
        let mut deferred = Vec::new();
        let disposition = self.inner.state.lock().finish_run(
            id,
            outcome.success,
            outcome.completed,
            finished_at,
            &mut deferred,
        );
        tracing::debug!(
            job_id = id,
            ?disposition,
            success = outcome.success,
            "job invocation finished"
        );

        run_deferred(deferred);
        if disposition == RunDisposition::Completed {
            (outcome.deliver)();
        }
    }
}

fn run_deferred(deferred: Vec<Deferred>) {
    for callback in deferred {
        callback();
    }
}

/// Ends a batch when dropped.
pub struct BatchGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.start();
    }
}

/// Closes the dispatch pass, also when a handler unwinds or the pass is dropped.
struct DispatchGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut deferred = Vec::new();
        {
            let mut state = self.scheduler.inner.state.lock();
            if let Some(id) = state.abandon_executing(&mut deferred) {
                tracing::error!(job_id = id, "job abandoned mid-invocation");
            }
            state.dispatching = false;
            self.scheduler.start_locked(&mut state);
        }
        if !deferred.is_empty() {
            self.scheduler
                .inner
                .spawner
                .spawn(Box::pin(async move { run_deferred(deferred) }));
        }
    }
}

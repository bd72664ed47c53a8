//! Job data model and caller-facing handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::handler::{PreHandler, Runnable};
use crate::util::clock::Instant;
use crate::util::serde::{JobId, LogLevel, Priority};

/// Lifecycle flags shared between the scheduler and outstanding handles.
///
/// Written only under the scheduler lock; handles read them lock-free.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    pending: AtomicBool,
    completed: AtomicBool,
    cancelled: AtomicBool,
    cancelling: AtomicBool,
}

impl Lifecycle {
    pub(crate) fn set_pending(&self, value: bool) {
        self.pending.store(value, Ordering::Release);
    }

    pub(crate) fn set_cancelling(&self) {
        self.cancelling.store(true, Ordering::Release);
    }

    pub(crate) fn mark_completed(&self) {
        self.pending.store(false, Ordering::Release);
        self.completed.store(true, Ordering::Release);
    }

    pub(crate) fn mark_cancelled(&self) {
        self.pending.store(false, Ordering::Release);
        self.cancelled.store(true, Ordering::Release);
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn is_cancelling(&self) -> bool {
        self.cancelling.load(Ordering::Acquire)
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.is_completed() || self.is_cancelled()
    }
}

/// Opaque handle to a scheduled job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub(crate) id: JobId,
    pub(crate) priority: Priority,
    pub(crate) lifecycle: Arc<Lifecycle>,
}

impl JobHandle {
    /// Job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Priority the job was scheduled with.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Waiting in the queue (initially, or for a retry or next step).
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lifecycle.is_pending()
    }

    /// Reached a terminal completion, successful or not.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.lifecycle.is_completed()
    }

    /// Reached the cancelled terminal state.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.lifecycle.is_cancelled()
    }

    /// Cancellation was requested while the job was executing.
    #[must_use]
    pub fn is_cancelling(&self) -> bool {
        self.lifecycle.is_cancelling()
    }
}

/// Opaque handle to a group.
#[derive(Debug, Clone)]
pub struct GroupHandle {
    pub(crate) id: JobId,
    pub(crate) lifecycle: Arc<Lifecycle>,
}

impl GroupHandle {
    /// Group identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// The group is scheduled and has not finished yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lifecycle.is_pending()
    }

    /// Every member finished and the group was not cancelled.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.lifecycle.is_completed()
    }

    /// The group finished after a cancellation request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.lifecycle.is_cancelled()
    }

    /// Cancellation was requested; members may still be finishing.
    #[must_use]
    pub fn is_cancelling(&self) -> bool {
        self.lifecycle.is_cancelling()
    }
}

/// Either kind of handle, accepted by the scheduler's query and cancel operations.
#[derive(Debug, Clone)]
pub enum Handle {
    /// A job.
    Job(JobHandle),
    /// A group.
    Group(GroupHandle),
}

impl Handle {
    /// Identifier of the job or group.
    #[must_use]
    pub const fn id(&self) -> JobId {
        match self {
            Self::Job(job) => job.id,
            Self::Group(group) => group.id,
        }
    }
}

impl From<JobHandle> for Handle {
    fn from(job: JobHandle) -> Self {
        Self::Job(job)
    }
}

impl From<&JobHandle> for Handle {
    fn from(job: &JobHandle) -> Self {
        Self::Job(job.clone())
    }
}

impl From<GroupHandle> for Handle {
    fn from(group: GroupHandle) -> Self {
        Self::Group(group)
    }
}

impl From<&GroupHandle> for Handle {
    fn from(group: &GroupHandle) -> Self {
        Self::Group(group.clone())
    }
}

/// Per-job scheduling options. Unset values fall back to the scheduler config.
#[derive(Clone, Default)]
pub struct JobOptions {
    pub(crate) priority: Option<Priority>,
    pub(crate) delay: Duration,
    pub(crate) max_run_count: Option<u32>,
    pub(crate) rerun_delay: Option<Duration>,
    pub(crate) group: Option<JobId>,
    pub(crate) log_level: Option<LogLevel>,
    pub(crate) pre_handler: Option<PreHandler>,
}

impl JobOptions {
    /// Options with every value defaulted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Wait this long after scheduling before the job becomes ready.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Total invocations allowed for one step before a failure becomes terminal.
    #[must_use]
    pub const fn with_max_run_count(mut self, max_run_count: u32) -> Self {
        self.max_run_count = Some(max_run_count);
        self
    }

    /// Spacing between retries of a failed step.
    #[must_use]
    pub const fn with_rerun_delay(mut self, rerun_delay: Duration) -> Self {
        self.rerun_delay = Some(rerun_delay);
        self
    }

    /// Make the job a member of `group`.
    #[must_use]
    pub const fn in_group(mut self, group: &GroupHandle) -> Self {
        self.group = Some(group.id);
        self
    }

    /// Set the log verbosity.
    #[must_use]
    pub const fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = Some(log_level);
        self
    }

    /// Gate every invocation on `gate`; a `false` return ends the job as cancelled.
    #[must_use]
    pub fn with_pre_handler<F>(mut self, gate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.pre_handler = Some(Arc::new(gate));
        self
    }
}

/// Scheduler-owned job state.
pub(crate) struct JobRecord {
    pub description: String,
    pub priority: Priority,
    pub delay: Duration,
    pub ready_at: Instant,
    pub run_count: u32,
    pub max_run_count: u32,
    pub rerun_delay: Duration,
    pub is_stepped: bool,
    pub is_continuation_step: bool,
    pub step_count: u32,
    pub group: Option<JobId>,
    pub log_level: LogLevel,
    pub runnable: Arc<dyn Runnable>,
    pub pre_handler: Option<PreHandler>,
    pub lifecycle: Arc<Lifecycle>,
}

//! Core scheduling abstractions: jobs, groups, the dispatch queue and the scheduler.

pub mod dispatch_queue;
pub mod error;
pub mod group;
pub mod handler;
pub mod host;
pub mod job;
pub mod log_sink;
pub mod result;
pub mod scheduler;
mod state;

pub use dispatch_queue::{Candidate, DispatchQueue, QueueEntry, RunningSlots};
pub use error::{AppResult, SchedulerError};
pub use group::{GroupCounters, GroupOptions};
pub use handler::{Completion, PreHandler, StepFn, StepFuture};
pub use host::{BoxFuture, Spawn, Timer, TimerCallback, TimerHandle};
pub use job::{GroupHandle, Handle, JobHandle, JobOptions};
pub use log_sink::{emit, InMemoryLogSink, LogChannel, LogEntry, LogSink, TracingLogSink};
pub use result::{JobResult, ResultKind};
pub use scheduler::{BatchGuard, Scheduler, SchedulerStats};

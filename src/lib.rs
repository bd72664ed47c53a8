//! # Prometheus Job Scheduler
//!
//! A cooperative, priority-based job scheduler for a single logical executor.
//!
//! Work is submitted as jobs: handlers with a priority, an optional start
//! delay, a retry budget and an optional completion callback. Jobs may be
//! grouped, and groups nest. The scheduler runs at most one handler at a time,
//! picks the next job by readiness and priority, and drives itself from a
//! single one-shot timer instead of polling.
//!
//! ## Key Features
//!
//! - **Priority selection**: High jobs run first; Medium jobs starve Low jobs
//!   while they are ready
//! - **Retries**: failed invocations are rerun after a delay until the run
//!   budget is spent
//! - **Stepped jobs**: long work split into steps that continue ahead of the queue
//! - **Groups**: completion aggregated over members, with nested sub-groups
//! - **Cancellation**: jobs and whole group trees, including jobs mid-execution
//! - **Batching**: reentrant stop/start so bursts of mutations arm the timer once
//! - **Injected host**: log sink, timer and spawner are traits with Tokio and
//!   `tracing` implementations supplied
//!
//! ```rust,ignore
//! use prometheus_job_scheduler::{JobOptions, Priority, Scheduler};
//!
//! let scheduler = Scheduler::builder().build()?;
//! let group = scheduler.add_group("sync", Default::default(), |ok| println!("sync ok: {ok}"));
//! scheduler.add_job(
//!     "fetch",
//!     JobOptions::new().with_priority(Priority::High).in_group(&group),
//!     || fetch_remote(),
//!     |reply| store(reply),
//! );
//! ```
//!
//! For complete examples, see:
//! - `tests/scheduler_test.rs` - Full integration tests

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: jobs, groups, queue and scheduler.
pub mod core;
/// Configuration model and loading.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Tokio adapters for the timer and spawner collaborators.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::SchedulerBuilder;
pub use crate::config::SchedulerConfig;
pub use crate::core::{
    GroupCounters, GroupHandle, GroupOptions, Handle, JobHandle, JobOptions, JobResult, LogSink,
    ResultKind, Scheduler, SchedulerError, SchedulerStats,
};
pub use crate::util::serde::{JobId, LogLevel, Priority};

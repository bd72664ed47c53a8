//! Tests for the scheduler builder

use prometheus_job_scheduler::builders::SchedulerBuilder;
use prometheus_job_scheduler::config::SchedulerConfig;
use prometheus_job_scheduler::core::{InMemoryLogSink, SchedulerError};
use prometheus_job_scheduler::runtime::{TokioSpawner, TokioTimer};
use prometheus_job_scheduler::{JobOptions, Priority};
use std::sync::Arc;

#[test]
fn test_builder_config_accessor() {
    let builder =
        SchedulerBuilder::new().with_config(SchedulerConfig::new().with_max_run_count(7));
    assert_eq!(builder.config().max_run_count, 7);
}

#[test]
fn test_builder_with_explicit_adapters_needs_no_ambient_runtime() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let scheduler = SchedulerBuilder::new()
        .with_timer(Arc::new(TokioTimer::new(runtime.handle().clone())))
        .with_spawner(Arc::new(TokioSpawner::new(runtime.handle().clone())))
        .with_log_sink(Arc::new(InMemoryLogSink::default()))
        .build()
        .unwrap();
    assert_eq!(scheduler.config().max_run_count, 3);
}

#[test]
fn test_builder_without_runtime_errors() {
    assert!(matches!(
        SchedulerBuilder::new().build(),
        Err(SchedulerError::NoRuntime)
    ));
}

#[tokio::test]
async fn test_builder_default_priority_applies() {
    let scheduler = SchedulerBuilder::new()
        .with_config(SchedulerConfig::new().with_default_priority(Priority::Low))
        .build()
        .unwrap();
    let job = scheduler.add_job("x", JobOptions::new(), || true, |_| {});
    assert_eq!(job.priority(), Priority::Low);
}

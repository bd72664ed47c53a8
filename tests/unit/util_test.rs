//! Tests for utility functions

use prometheus_job_scheduler::util::{now_ms, JobId, LogLevel, Priority};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High > Priority::Medium);
    assert!(Priority::Medium > Priority::Low);
    assert_eq!(Priority::default(), Priority::Medium);
}

#[test]
fn test_priority_parse() {
    assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
    assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
    assert!("urgent".parse::<Priority>().is_err());
}

#[test]
fn test_log_level_parse() {
    assert_eq!("debug_only".parse::<LogLevel>().unwrap(), LogLevel::DebugOnly);
    assert_eq!("Quiet".parse::<LogLevel>().unwrap(), LogLevel::Quiet);
    assert!("verbose".parse::<LogLevel>().is_err());
}

#[test]
fn test_priority_serde_snake_case() {
    assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), "\"medium\"");
    let level: LogLevel = serde_json::from_str("\"debug_only\"").unwrap();
    assert_eq!(level, LogLevel::DebugOnly);
}

#[test]
fn test_job_id() {
    let id: JobId = 12345;
    assert_eq!(id, 12345);
}

#[test]
fn test_now_ms_is_after_2020() {
    assert!(now_ms() > 1_577_836_800_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    prometheus_job_scheduler::util::init_tracing_with_default("prometheus_job_scheduler=debug");
    prometheus_job_scheduler::util::init_tracing();
    tracing::debug!("tracing initialised");
}

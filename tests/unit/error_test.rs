//! Tests for error types

use prometheus_job_scheduler::core::{AppResult, SchedulerError};

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("max_run_count must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_run_count must be greater than 0"
    );
}

#[test]
fn test_config_error() {
    let err = SchedulerError::Config("bad json".to_string());
    assert_eq!(format!("{}", err), "config error: bad json");
}

#[test]
fn test_no_runtime_error() {
    let err = SchedulerError::NoRuntime;
    assert_eq!(format!("{}", err), "no tokio runtime available");
}

#[test]
fn test_app_result_wraps_scheduler_error() {
    fn load() -> AppResult<()> {
        Err(SchedulerError::NoRuntime.into())
    }
    let err = load().unwrap_err();
    assert!(err.downcast_ref::<SchedulerError>().is_some());
}

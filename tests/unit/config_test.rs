//! Tests for configuration validation and loading

use prometheus_job_scheduler::config::SchedulerConfig;
use prometheus_job_scheduler::core::SchedulerError;
use prometheus_job_scheduler::{LogLevel, Priority};
use std::time::Duration;

#[test]
fn test_default_config_is_valid() {
    assert!(SchedulerConfig::default().validate().is_ok());
}

#[test]
fn test_zero_run_count_invalid() {
    let config = SchedulerConfig::new().with_max_run_count(0);
    assert!(matches!(
        config.validate(),
        Err(SchedulerError::InvalidConfig(_))
    ));
}

#[test]
fn test_json_partial_document_keeps_defaults() {
    let config = SchedulerConfig::from_json_str(
        r#"{ "max_run_count": 5, "default_priority": "low", "log_level": "debug_only" }"#,
    )
    .unwrap();
    assert_eq!(config.max_run_count, 5);
    assert_eq!(config.default_priority, Priority::Low);
    assert_eq!(config.log_level, LogLevel::DebugOnly);
    assert_eq!(config.rerun_delay(), Duration::from_secs(5));
    assert_eq!(config.wait_priority, Priority::High);
}

#[test]
fn test_json_malformed() {
    let err = SchedulerConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, SchedulerError::Config(_)));
}

#[test]
fn test_json_invalid_value() {
    let err = SchedulerConfig::from_json_str(r#"{ "max_run_count": 0 }"#).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[test]
fn test_config_serialization_round_trip() {
    let config = SchedulerConfig::new()
        .with_default_priority(Priority::High)
        .with_rerun_delay(Duration::from_millis(1500))
        .with_log_level(LogLevel::Quiet);
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_lookup_log_level() {
    let config = SchedulerConfig::from_lookup(|key| {
        (key == "JOB_SCHEDULER_LOG_LEVEL").then(|| "quiet".to_string())
    })
    .unwrap();
    assert_eq!(config.log_level, LogLevel::Quiet);
}

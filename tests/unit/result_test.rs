//! Tests for the result success policy

use prometheus_job_scheduler::core::{JobResult, ResultKind};

#[derive(Debug)]
enum Verdict {
    Accepted,
    Rejected,
}

impl JobResult for Verdict {
    fn kind(&self) -> ResultKind {
        ResultKind::Categorical
    }
}

#[test]
fn test_categorical_is_always_success() {
    assert!(Verdict::Accepted.is_success());
    assert!(Verdict::Rejected.is_success());
}

#[test]
fn test_numeric_sign() {
    assert!(0_i32.is_success());
    assert!(2.5_f64.is_success());
    assert!(!(-1_i64).is_success());
}

#[test]
fn test_reference_presence() {
    assert!(Some("x").is_success());
    assert!(!None::<String>.is_success());
}

//! Tests for log routing

use prometheus_job_scheduler::core::{emit, InMemoryLogSink, LogChannel, LogSink, TracingLogSink};
use prometheus_job_scheduler::LogLevel;

#[test]
fn test_normal_routes_by_channel() {
    let sink = InMemoryLogSink::default();
    emit(&sink, LogLevel::Normal, LogChannel::Running, "start");
    emit(&sink, LogLevel::Normal, LogChannel::Failed, "boom");

    assert_eq!(sink.messages(LogChannel::Running), vec!["start"]);
    assert_eq!(sink.messages(LogChannel::Failed), vec!["boom"]);
    assert!(sink.messages(LogChannel::Debug).is_empty());
}

#[test]
fn test_quiet_keeps_only_debug() {
    let sink = InMemoryLogSink::default();
    emit(&sink, LogLevel::Quiet, LogChannel::Completed, "done");
    emit(&sink, LogLevel::Quiet, LogChannel::Debug, "detail");

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].channel, LogChannel::Debug);
    assert_eq!(entries[0].message, "detail");
}

#[test]
fn test_bounded_buffer_drops_oldest() {
    let sink = InMemoryLogSink::new(2);
    for msg in ["a", "b", "c"] {
        sink.debug(msg);
    }
    assert_eq!(sink.messages(LogChannel::Debug), vec!["b", "c"]);

    sink.clear();
    assert!(sink.entries().is_empty());
}

#[test]
fn test_tracing_sink_without_subscriber() {
    let sink = TracingLogSink;
    sink.running("r");
    sink.completed("c");
    sink.failed("f");
    sink.debug("d");
}

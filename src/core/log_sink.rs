//! Log sink implementations.
//!
//! The scheduler reports job and group progress through an injected [`LogSink`].
//! Provides a `tracing`-backed sink for production and a bounded in-memory sink
//! for tests and dev.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::util::clock::now_ms;
use crate::util::serde::LogLevel;

/// Destination for job and group progress messages.
pub trait LogSink: Send + Sync {
    /// A job or group started running.
    fn running(&self, msg: &str);
    /// A job or group completed successfully.
    fn completed(&self, msg: &str);
    /// A job or group completed with a failure.
    fn failed(&self, msg: &str);
    /// Diagnostic detail (retries, steps, cancellation).
    fn debug(&self, msg: &str);
}

/// The sink operation a message is addressed to before log-level filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogChannel {
    /// `LogSink::running`.
    Running,
    /// `LogSink::completed`.
    Completed,
    /// `LogSink::failed`.
    Failed,
    /// `LogSink::debug`.
    Debug,
}

/// Route `msg` to `sink` according to the emitting job's `level`.
pub fn emit(sink: &dyn LogSink, level: LogLevel, channel: LogChannel, msg: &str) {
    match (level, channel) {
        (LogLevel::Normal, LogChannel::Running) => sink.running(msg),
        (LogLevel::Normal, LogChannel::Completed) => sink.completed(msg),
        (LogLevel::Normal, LogChannel::Failed) => sink.failed(msg),
        (_, LogChannel::Debug) | (LogLevel::DebugOnly, _) => sink.debug(msg),
        (LogLevel::Quiet, _) => {}
    }
}

/// Sink forwarding to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn running(&self, msg: &str) {
        tracing::info!(target: "job_scheduler", status = "running", "{msg}");
    }

    fn completed(&self, msg: &str) {
        tracing::info!(target: "job_scheduler", status = "completed", "{msg}");
    }

    fn failed(&self, msg: &str) {
        tracing::warn!(target: "job_scheduler", status = "failed", "{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!(target: "job_scheduler", "{msg}");
    }
}

/// A recorded log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Operation the message arrived on.
    pub channel: LogChannel,
    /// Message text.
    pub message: String,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// In-memory log sink for testing and dev.
pub struct InMemoryLogSink {
    entries: Mutex<VecDeque<LogEntry>>,
    max_entries: usize,
}

impl InMemoryLogSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_entries.min(1024))),
            max_entries,
        }
    }

    /// Retrieve a snapshot of stored entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Messages recorded on one channel, oldest first.
    pub fn messages(&self, channel: LogChannel) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.channel == channel)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Drop every recorded entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn record(&self, channel: LogChannel, msg: &str) {
        let mut entries = self.entries.lock();
        if self.max_entries == 0 {
            return;
        }
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            channel,
            message: msg.to_string(),
            created_at_ms: now_ms(),
        });
    }
}

impl Default for InMemoryLogSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl LogSink for InMemoryLogSink {
    fn running(&self, msg: &str) {
        self.record(LogChannel::Running, msg);
    }

    fn completed(&self, msg: &str) {
        self.record(LogChannel::Completed, msg);
    }

    fn failed(&self, msg: &str) {
        self.record(LogChannel::Failed, msg);
    }

    fn debug(&self, msg: &str) {
        self.record(LogChannel::Debug, msg);
    }
}

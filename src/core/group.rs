//! Group data model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::job::{GroupHandle, Lifecycle};
use crate::util::serde::{JobId, LogLevel};

/// Options for a new group.
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    pub(crate) parent: Option<JobId>,
    pub(crate) log_level: Option<LogLevel>,
}

impl GroupOptions {
    /// Options with every value defaulted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Nest the new group inside `parent`.
    #[must_use]
    pub const fn in_group(mut self, parent: &GroupHandle) -> Self {
        self.parent = Some(parent.id);
        self
    }

    /// Set the log verbosity.
    #[must_use]
    pub const fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = Some(log_level);
        self
    }
}

/// Snapshot of a live group's member counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCounters {
    /// Members (jobs and sub-groups) not yet terminal.
    pub pending_jobs: u32,
    /// Members that completed, successfully or not.
    pub completed_jobs: u32,
    /// Members that were cancelled.
    pub cancelled_jobs: u32,
    /// Completed members that failed.
    pub error_count: u32,
}

/// Scheduler-owned group state.
pub(crate) struct GroupRecord {
    pub description: String,
    pub parent: Option<JobId>,
    pub log_level: LogLevel,
    pub counters: GroupCounters,
    pub started: bool,
    pub on_complete: Option<Box<dyn FnOnce(bool) + Send + 'static>>,
    pub lifecycle: Arc<Lifecycle>,
}

impl GroupRecord {
    /// Whether members may still be attached.
    pub fn accepts_members(&self) -> bool {
        !self.lifecycle.is_terminal() && !self.lifecycle.is_cancelling()
    }
}

//! Dispatch queue with priority- and readiness-aware selection.
//!
//! The queue is insertion-ordered and holds both jobs and groups; groups are
//! inert placeholders the selection scan skips. Ordering within a priority comes
//! from queue position alone: continuation steps go to the front, everything
//! else to the back.

use std::collections::VecDeque;
use std::time::Duration;

use crate::util::clock::Instant;
use crate::util::serde::{JobId, Priority};

/// An entry in the dispatch queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueEntry {
    /// A schedulable job.
    Job(JobId),
    /// A group placeholder.
    Group(JobId),
}

impl QueueEntry {
    /// Identifier of the job or group.
    #[must_use]
    pub const fn id(self) -> JobId {
        match self {
            Self::Job(id) | Self::Group(id) => id,
        }
    }
}

/// The scheduling facts selection needs about a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Job priority.
    pub priority: Priority,
    /// Instant the job becomes eligible.
    pub ready_at: Instant,
}

impl Candidate {
    /// Whether the job's delay has elapsed at `now`.
    #[must_use]
    pub fn is_ready(&self, now: Instant) -> bool {
        now >= self.ready_at
    }
}

/// Single-slot locks per priority tier. A slot stays taken while its job is in
/// flight, including the gaps between retries and steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningSlots {
    /// Low/Medium job currently in flight.
    pub job: Option<JobId>,
    /// High job currently in flight.
    pub high_priority_job: Option<JobId>,
}

impl RunningSlots {
    /// Whether the slots allow job `id` of `priority` to be selected.
    #[must_use]
    pub fn admits(&self, id: JobId, priority: Priority) -> bool {
        match self.high_priority_job {
            Some(running) => running == id,
            None => priority == Priority::High || self.job.is_none_or(|running| running == id),
        }
    }

    /// Clear whichever slot holds `id`.
    pub fn release(&mut self, id: JobId) {
        if self.job == Some(id) {
            self.job = None;
        }
        if self.high_priority_job == Some(id) {
            self.high_priority_job = None;
        }
    }
}

/// Insertion-ordered queue of pending jobs and groups.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    entries: VecDeque<QueueEntry>,
}

impl DispatchQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push_back(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    /// Insert an entry ahead of everything else.
    pub fn push_front(&mut self, entry: QueueEntry) {
        self.entries.push_front(entry);
    }

    /// Remove the entry with `id`. Returns whether it was present.
    pub fn remove(&mut self, id: JobId) -> bool {
        match self.entries.iter().position(|e| e.id() == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether an entry with `id` is queued.
    #[must_use]
    pub fn contains(&self, id: JobId) -> bool {
        self.entries.iter().any(|e| e.id() == id)
    }

    /// Number of entries, jobs and groups together.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in queue order.
    pub fn iter(&self) -> impl Iterator<Item = QueueEntry> + '_ {
        self.entries.iter().copied()
    }

    /// Job identifiers in queue order, groups skipped.
    pub fn job_ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.entries.iter().filter_map(|e| match e {
            QueueEntry::Job(id) => Some(*id),
            QueueEntry::Group(_) => None,
        })
    }

    /// Pick the job to run next.
    ///
    /// The first ready, admitted High job wins outright. Otherwise the first
    /// ready Medium job wins, and a Low job is chosen only when no Medium job is
    /// ready. `lookup` returning `None` skips the id.
    pub fn select_next<F>(&self, slots: RunningSlots, now: Instant, lookup: F) -> Option<JobId>
    where
        F: Fn(JobId) -> Option<Candidate>,
    {
        let mut best: Option<(JobId, Priority)> = None;
        for id in self.job_ids() {
            let Some(candidate) = lookup(id) else {
                continue;
            };
            if !candidate.is_ready(now) || !slots.admits(id, candidate.priority) {
                continue;
            }
            match candidate.priority {
                Priority::High => return Some(id),
                Priority::Medium => {
                    if !matches!(best, Some((_, Priority::Medium))) {
                        best = Some((id, Priority::Medium));
                    }
                }
                Priority::Low => {
                    if best.is_none() {
                        best = Some((id, Priority::Low));
                    }
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Time until the earliest admitted job becomes ready, clamped at zero.
    ///
    /// Jobs blocked by a running slot are skipped so a waiting Low job cannot
    /// keep re-arming a zero-delay timer while a Medium job holds the slot.
    pub fn next_wake<F>(&self, slots: RunningSlots, now: Instant, lookup: F) -> Option<Duration>
    where
        F: Fn(JobId) -> Option<Candidate>,
    {
        self.job_ids()
            .filter_map(|id| lookup(id).filter(|c| slots.admits(id, c.priority)))
            .map(|c| c.ready_at.saturating_duration_since(now))
            .min()
    }
}

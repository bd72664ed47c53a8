//! Scheduler state and the job/group lifecycle protocols.
//!
//! Everything here runs under the scheduler mutex and never calls user code.
//! Callbacks produced by a transition are pushed to a `deferred` list that the
//! caller runs after releasing the lock, so handlers and callbacks may call
//! back into the scheduler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::dispatch_queue::{Candidate, DispatchQueue, QueueEntry, RunningSlots};
use super::group::{GroupCounters, GroupRecord};
use super::handler::{Deferred, PreHandler, Runnable};
use super::host::TimerHandle;
use super::job::JobRecord;
use super::log_sink::{self, LogChannel, LogSink};
use crate::util::clock::{self, Instant};
use crate::util::serde::{JobId, LogLevel, Priority};

/// What the dispatch loop needs to invoke a selected job outside the lock.
pub(crate) struct PreparedRun {
    pub runnable: Arc<dyn Runnable>,
    pub pre_handler: Option<PreHandler>,
    pub is_first_step: bool,
}

/// How an invocation ended for the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunDisposition {
    /// Same step rescheduled after the rerun delay.
    Retry,
    /// Next continuation step scheduled at the queue front.
    Step,
    /// Terminal completion.
    Completed,
    /// Terminal cancellation.
    Cancelled,
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelOutcome {
    /// Removed before running.
    Cancelled,
    /// A targeted job is executing; it was flagged and will stop after the
    /// current invocation.
    Cancelling,
    /// Unknown or already terminal.
    NotFound,
}

#[derive(Debug, Clone, Copy)]
enum MemberOutcome {
    Completed { success: bool },
    Cancelled,
}

pub(crate) struct SchedulerState {
    pub queue: DispatchQueue,
    pub jobs: HashMap<JobId, JobRecord>,
    pub groups: HashMap<JobId, GroupRecord>,
    pub slots: RunningSlots,
    /// Job whose handler invocation is in flight.
    pub executing: Option<JobId>,
    pub stop_count: u32,
    pub timer: Option<Box<dyn TimerHandle>>,
    /// Bumped whenever the armed timer is discarded; fires carrying an older
    /// generation are ignored.
    pub timer_generation: u64,
    pub timer_arms: u64,
    pub dispatching: bool,
    log: Arc<dyn LogSink>,
}

impl SchedulerState {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self {
            queue: DispatchQueue::new(),
            jobs: HashMap::new(),
            groups: HashMap::new(),
            slots: RunningSlots::default(),
            executing: None,
            stop_count: 0,
            timer: None,
            timer_generation: 0,
            timer_arms: 0,
            dispatching: false,
            log,
        }
    }

    fn emit(&self, level: LogLevel, channel: LogChannel, msg: &str) {
        log_sink::emit(self.log.as_ref(), level, channel, msg);
    }

    fn candidate(&self, id: JobId) -> Option<Candidate> {
        self.jobs.get(&id).map(|job| Candidate {
            priority: job.priority,
            ready_at: job.ready_at,
        })
    }

    pub fn select_next(&self, now: Instant) -> Option<JobId> {
        self.queue
            .select_next(self.slots, now, |id| self.candidate(id))
    }

    pub fn next_wake(&self, now: Instant) -> Option<Duration> {
        self.queue.next_wake(self.slots, now, |id| self.candidate(id))
    }

    // ------------------------------------------------------------------
    // Start/stop batching
    // ------------------------------------------------------------------

    pub fn stop(&mut self) {
        if self.stop_count == 0 {
            if let Some(timer) = self.timer.take() {
                timer.cancel();
            }
            self.timer_generation += 1;
        }
        self.stop_count += 1;
    }

    /// Leave one stop level. Returns the wait to arm the timer for once the
    /// count is back to zero and something can run.
    pub fn start(&mut self, now: Instant) -> Option<Duration> {
        debug_assert!(self.stop_count > 0, "start() without a matching stop()");
        self.stop_count = self.stop_count.saturating_sub(1);
        if self.stop_count > 0 || self.queue.is_empty() {
            return None;
        }
        self.next_wake(now)
    }

    pub fn install_timer(&mut self, handle: Box<dyn TimerHandle>) {
        self.timer = Some(handle);
        self.timer_arms += 1;
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Count one more member against `group_id`. False if the group is gone
    /// or no longer accepts members.
    pub fn attach_to_group(&mut self, group_id: JobId) -> bool {
        match self.groups.get_mut(&group_id) {
            Some(group) if group.accepts_members() => {
                group.counters.pending_jobs += 1;
                true
            }
            _ => false,
        }
    }

    pub fn add_job(&mut self, id: JobId, record: JobRecord, now: Instant) {
        let ready_at = clock::ready_after(now, record.delay);
        self.jobs.insert(id, record);
        self.enqueue(id, ready_at, false);
    }

    pub fn add_group(&mut self, id: JobId, record: GroupRecord) {
        record.lifecycle.set_pending(true);
        self.groups.insert(id, record);
        self.queue.push_back(QueueEntry::Group(id));
    }

    fn enqueue(&mut self, id: JobId, ready_at: Instant, at_front: bool) {
        if let Some(job) = self.jobs.get_mut(&id) {
            job.ready_at = ready_at;
            job.lifecycle.set_pending(true);
        }
        if at_front {
            self.queue.push_front(QueueEntry::Job(id));
        } else {
            self.queue.push_back(QueueEntry::Job(id));
        }
    }

    /// Drop the remaining delay; the job keeps its queue position.
    pub fn clear_delay(&mut self, id: JobId, now: Instant) -> bool {
        match self.jobs.get_mut(&id) {
            Some(job) => {
                job.delay = Duration::ZERO;
                job.ready_at = now;
                true
            }
            None => false,
        }
    }

    pub fn group_counters(&self, id: JobId) -> Option<GroupCounters> {
        self.groups.get(&id).map(|group| group.counters)
    }

    // ------------------------------------------------------------------
    // Job execution
    // ------------------------------------------------------------------

    /// Take `id` out of the queue and mark it executing.
    pub fn begin_run(&mut self, id: JobId) -> Option<PreparedRun> {
        debug_assert!(self.executing.is_none(), "two jobs executing at once");
        self.queue.remove(id);
        let job = self.jobs.get_mut(&id)?;
        job.run_count += 1;
        job.lifecycle.set_pending(false);

        let is_first_step = !job.is_continuation_step;
        let prepared = PreparedRun {
            runnable: Arc::clone(&job.runnable),
            pre_handler: job.pre_handler.clone(),
            is_first_step,
        };
        let message = match (is_first_step, job.run_count) {
            (true, 1) => (LogChannel::Running, job.description.clone()),
            (true, n) => (
                LogChannel::Debug,
                format!("{} retry (run {n} of {})", job.description, job.max_run_count),
            ),
            (false, n) => (
                LogChannel::Debug,
                format!("{} step {} (run {n})", job.description, job.step_count + 1),
            ),
        };
        let (level, group, priority) = (job.log_level, job.group, job.priority);

        if priority == Priority::High {
            self.slots.high_priority_job = Some(id);
        } else {
            self.slots.job = Some(id);
        }
        self.executing = Some(id);
        self.emit(level, message.0, &message.1);

        if is_first_step {
            if let Some(group_id) = group {
                self.notify_group_starting(group_id);
            }
        }
        Some(prepared)
    }

    /// Apply the outcome of one invocation: retry, continue, complete or cancel.
    ///
    /// The job counts as executing until the transition is committed, so an
    /// unwind in between still lets `abandon_executing` settle it.
    pub fn finish_run(
        &mut self,
        id: JobId,
        success: bool,
        completed: bool,
        now: Instant,
        deferred: &mut Vec<Deferred>,
    ) -> RunDisposition {
        let disposition = self.settle_run(id, success, completed, now, deferred);
        self.executing = None;
        disposition
    }

    fn settle_run(
        &mut self,
        id: JobId,
        success: bool,
        completed: bool,
        now: Instant,
        deferred: &mut Vec<Deferred>,
    ) -> RunDisposition {
        let Some(job) = self.jobs.get_mut(&id) else {
            self.slots.release(id);
            return RunDisposition::Cancelled;
        };
        let cancelling = job.lifecycle.is_cancelling();
        let mut completed = completed;

        if !success {
            if job.run_count < job.max_run_count && !cancelling {
                job.delay = job.rerun_delay;
                let ready_at = clock::ready_after(now, job.rerun_delay);
                let (level, at_front) = (job.log_level, job.is_continuation_step);
                let message = format!(
                    "{} failed (run {} of {}), retrying in {:?}",
                    job.description, job.run_count, job.max_run_count, job.rerun_delay
                );
                self.emit(level, LogChannel::Debug, &message);
                self.enqueue(id, ready_at, at_front);
                return RunDisposition::Retry;
            }
            completed = true;
        }

        if !completed && !cancelling && job.is_stepped {
            job.run_count = 0;
            job.is_continuation_step = true;
            job.step_count += 1;
            job.delay = Duration::ZERO;
            let level = job.log_level;
            let message = format!("{} step {} complete", job.description, job.step_count);
            self.emit(level, LogChannel::Debug, &message);
            self.enqueue(id, now, true);
            return RunDisposition::Step;
        }

        if completed {
            self.complete_job(id, success, deferred);
            RunDisposition::Completed
        } else {
            self.finish_cancelled(id, deferred);
            RunDisposition::Cancelled
        }
    }

    /// The pre-handler vetoed the run: end the job as cancelled.
    pub fn veto_run(&mut self, id: JobId, deferred: &mut Vec<Deferred>) {
        self.executing = None;
        if let Some(job) = self.jobs.get(&id) {
            let message = format!("{} vetoed by pre-handler", job.description);
            self.emit(job.log_level, LogChannel::Debug, &message);
        }
        self.finish_cancelled(id, deferred);
    }

    /// Drop the executing job after its handler unwound; group members are
    /// settled as failures.
    pub fn abandon_executing(&mut self, deferred: &mut Vec<Deferred>) -> Option<JobId> {
        let id = self.executing.take()?;
        self.queue.remove(id);
        self.slots.release(id);
        if let Some(job) = self.jobs.remove(&id) {
            job.lifecycle.mark_completed();
            let message = format!("{} aborted", job.description);
            self.emit(job.log_level, LogChannel::Failed, &message);
            if let Some(group_id) = job.group {
                self.notify_member_finished(
                    group_id,
                    MemberOutcome::Completed { success: false },
                    deferred,
                );
            }
        }
        Some(id)
    }

    fn complete_job(&mut self, id: JobId, success: bool, deferred: &mut Vec<Deferred>) {
        self.slots.release(id);
        let Some(job) = self.jobs.remove(&id) else {
            return;
        };
        job.lifecycle.mark_completed();
        let channel = if success {
            LogChannel::Completed
        } else {
            LogChannel::Failed
        };
        self.emit(job.log_level, channel, &job.description);
        if let Some(group_id) = job.group {
            self.notify_member_finished(group_id, MemberOutcome::Completed { success }, deferred);
        }
    }

    fn finish_cancelled(&mut self, id: JobId, deferred: &mut Vec<Deferred>) {
        self.slots.release(id);
        self.queue.remove(id);
        let Some(job) = self.jobs.remove(&id) else {
            return;
        };
        job.lifecycle.mark_cancelled();
        let message = format!("{} cancelled", job.description);
        self.emit(job.log_level, LogChannel::Debug, &message);
        if let Some(group_id) = job.group {
            self.notify_member_finished(group_id, MemberOutcome::Cancelled, deferred);
        }
    }

    // ------------------------------------------------------------------
    // Group protocol
    // ------------------------------------------------------------------

    fn notify_group_starting(&mut self, group_id: JobId) {
        let Some(group) = self.groups.get_mut(&group_id) else {
            return;
        };
        if group.started {
            return;
        }
        group.started = true;
        let (level, description, parent) =
            (group.log_level, group.description.clone(), group.parent);
        self.emit(level, LogChannel::Running, &description);
        if let Some(parent) = parent {
            self.notify_group_starting(parent);
        }
    }

    fn notify_member_finished(
        &mut self,
        group_id: JobId,
        outcome: MemberOutcome,
        deferred: &mut Vec<Deferred>,
    ) {
        let Some(group) = self.groups.get_mut(&group_id) else {
            tracing::warn!(group_id, "member finished for an unknown group");
            return;
        };
        debug_assert!(group.counters.pending_jobs > 0, "group pending count underflow");
        let counters = &mut group.counters;
        counters.pending_jobs = counters.pending_jobs.saturating_sub(1);
        match outcome {
            MemberOutcome::Completed { success } => {
                counters.completed_jobs += 1;
                if !success {
                    counters.error_count += 1;
                }
            }
            MemberOutcome::Cancelled => counters.cancelled_jobs += 1,
        }
        if counters.pending_jobs == 0 {
            self.finish_group(group_id, deferred);
        }
    }

    fn finish_group(&mut self, group_id: JobId, deferred: &mut Vec<Deferred>) {
        let Some(mut group) = self.groups.remove(&group_id) else {
            return;
        };
        self.queue.remove(group_id);
        let success = group.counters.error_count == 0;
        let cancelled = group.lifecycle.is_cancelling();
        tracing::debug!(group_id, success, cancelled, counters = ?group.counters, "group finished");

        if cancelled {
            group.lifecycle.mark_cancelled();
            let message = format!("{} cancelled", group.description);
            self.emit(group.log_level, LogChannel::Debug, &message);
        } else {
            group.lifecycle.mark_completed();
            let channel = if success {
                LogChannel::Completed
            } else {
                LogChannel::Failed
            };
            self.emit(group.log_level, channel, &group.description);
        }

        if let Some(parent) = group.parent {
            let outcome = if cancelled {
                MemberOutcome::Cancelled
            } else {
                MemberOutcome::Completed { success }
            };
            self.notify_member_finished(parent, outcome, deferred);
        }
        if let Some(callback) = group.on_complete.take() {
            deferred.push(Box::new(move || callback(success)));
        }
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    pub fn cancel_job(&mut self, id: JobId, deferred: &mut Vec<Deferred>) -> CancelOutcome {
        let Some(job) = self.jobs.get(&id) else {
            return CancelOutcome::NotFound;
        };
        if self.executing == Some(id) {
            job.lifecycle.set_cancelling();
            let message = format!("{} cancelling", job.description);
            self.emit(job.log_level, LogChannel::Debug, &message);
            return CancelOutcome::Cancelling;
        }
        self.finish_cancelled(id, deferred);
        CancelOutcome::Cancelled
    }

    pub fn cancel_group(&mut self, group_id: JobId, deferred: &mut Vec<Deferred>) -> CancelOutcome {
        if !self.groups.contains_key(&group_id) {
            return CancelOutcome::NotFound;
        }

        // The group and all nested sub-groups, parents before children.
        let mut family = vec![group_id];
        let mut index = 0;
        while index < family.len() {
            let current = family[index];
            let children: Vec<JobId> = self
                .queue
                .iter()
                .filter_map(|entry| match entry {
                    QueueEntry::Group(id)
                        if self.groups.get(&id).and_then(|g| g.parent) == Some(current) =>
                    {
                        Some(id)
                    }
                    _ => None,
                })
                .collect();
            family.extend(children);
            index += 1;
        }
        for id in &family {
            if let Some(group) = self.groups.get(id) {
                group.lifecycle.set_cancelling();
            }
        }
        if let Some(group) = self.groups.get(&group_id) {
            let message = format!("{} cancelling", group.description);
            self.emit(group.log_level, LogChannel::Debug, &message);
        }

        let members: Vec<JobId> = self
            .queue
            .job_ids()
            .chain(self.executing)
            .filter(|id| {
                self.jobs
                    .get(id)
                    .and_then(|job| job.group)
                    .is_some_and(|g| family.contains(&g))
            })
            .collect();

        let mut outcome = CancelOutcome::Cancelled;
        for id in members {
            if self.cancel_job(id, deferred) == CancelOutcome::Cancelling {
                outcome = CancelOutcome::Cancelling;
            }
        }

        // Groups without members never see a member finish; close them here,
        // innermost first.
        for id in family.iter().rev() {
            if self
                .groups
                .get(id)
                .is_some_and(|g| g.counters.pending_jobs == 0)
            {
                self.finish_group(*id, deferred);
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handler::{plain, JobRunner};
    use crate::core::job::Lifecycle;
    use crate::core::log_sink::InMemoryLogSink;
    use crate::util::clock::FAR_FUTURE;

    fn record(description: &str, is_stepped: bool, rerun_delay: Duration) -> JobRecord {
        JobRecord {
            description: description.to_string(),
            priority: Priority::Medium,
            delay: Duration::ZERO,
            ready_at: Instant::now(),
            run_count: 0,
            max_run_count: 3,
            rerun_delay,
            is_stepped,
            is_continuation_step: false,
            step_count: 0,
            group: None,
            log_level: LogLevel::Normal,
            runnable: Arc::new(JobRunner::new(plain(|| true), Box::new(|_: bool| {}))),
            pre_handler: None,
            lifecycle: Arc::new(Lifecycle::default()),
        }
    }

    fn state() -> SchedulerState {
        SchedulerState::new(Arc::new(InMemoryLogSink::default()))
    }

    #[test]
    fn test_failed_continuation_step_retries_at_front() {
        let mut state = state();
        let now = Instant::now();
        let mut deferred = Vec::new();
        state.add_job(1, record("stepped", true, Duration::ZERO), now);
        state.add_job(2, record("other", false, Duration::ZERO), now);

        state.begin_run(1).unwrap();
        let step = state.finish_run(1, true, false, now, &mut deferred);
        assert_eq!(step, RunDisposition::Step);
        assert_eq!(state.queue.job_ids().collect::<Vec<_>>(), vec![1, 2]);

        state.begin_run(1).unwrap();
        let retry = state.finish_run(1, false, false, now, &mut deferred);
        assert_eq!(retry, RunDisposition::Retry);
        assert_eq!(state.queue.job_ids().collect::<Vec<_>>(), vec![1, 2]);
        assert!(deferred.is_empty());
    }

    #[test]
    fn test_first_step_retry_goes_to_back() {
        let mut state = state();
        let now = Instant::now();
        let mut deferred = Vec::new();
        state.add_job(1, record("plain", false, Duration::ZERO), now);
        state.add_job(2, record("other", false, Duration::ZERO), now);

        state.begin_run(1).unwrap();
        state.finish_run(1, false, true, now, &mut deferred);
        assert_eq!(state.queue.job_ids().collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_huge_delays_saturate() {
        let mut state = state();
        let now = Instant::now();
        let mut deferred = Vec::new();
        let mut delayed = record("delayed", false, Duration::ZERO);
        delayed.delay = Duration::MAX;
        state.add_job(1, delayed, now);
        assert_eq!(state.jobs[&1].ready_at.duration_since(now), FAR_FUTURE);

        state.add_job(2, record("flaky", false, Duration::MAX), now);
        state.begin_run(2).unwrap();
        let disposition = state.finish_run(2, false, true, now, &mut deferred);
        assert_eq!(disposition, RunDisposition::Retry);
        assert_eq!(state.executing, None);
        assert_eq!(state.jobs[&2].ready_at.duration_since(now), FAR_FUTURE);
        assert!(state.jobs[&2].lifecycle.is_pending());
    }

    #[test]
    fn test_group_pending_until_finished() {
        let mut state = state();
        let lifecycle = Arc::new(Lifecycle::default());
        assert!(!lifecycle.is_pending());

        let group = GroupRecord {
            description: "g".to_string(),
            parent: None,
            log_level: LogLevel::Normal,
            counters: GroupCounters::default(),
            started: false,
            on_complete: None,
            lifecycle: Arc::clone(&lifecycle),
        };
        state.add_group(10, group);
        assert!(lifecycle.is_pending());

        let mut deferred = Vec::new();
        assert_eq!(state.cancel_group(10, &mut deferred), CancelOutcome::Cancelled);
        assert!(!lifecycle.is_pending());
        assert!(lifecycle.is_cancelled());
    }
}

//! Queue types for the limiter

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use super::tier::TierKind;

/// Unique identity of a submitted task
///
/// Generated at submission time and never derived from the operation or its
/// arguments, so two identical submissions are always distinct tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a launched job ended, from the limiter's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    /// The operation produced a value or a failure and the handle was settled
    Settled,
    /// The operation panicked; the handle observes an abandoned task
    Panicked,
}

/// Type-erased job: runs the operation and settles the caller's handle
pub(crate) type Job = Box<dyn FnOnce() -> BoxFuture<'static, Settlement> + Send>;

/// A task waiting in the pending queue
pub(crate) struct PendingTask {
    pub id: TaskId,
    pub seq: u64,
    pub label: String,
    pub submitted_at: Instant,
    pub submitted_wall: DateTime<Utc>,
    pub job: Job,
}

impl PendingTask {
    pub(crate) fn new(id: TaskId, seq: u64, label: String, job: Job) -> Self {
        Self {
            id,
            seq,
            label,
            submitted_at: Instant::now(),
            submitted_wall: Utc::now(),
            job,
        }
    }

    /// Split into the running-set record and the job to launch
    pub(crate) fn into_running(self, now: Instant) -> (RunningTask, Job) {
        let running = RunningTask {
            id: self.id,
            seq: self.seq,
            label: self.label,
            submitted_at: self.submitted_at,
            submitted_wall: self.submitted_wall,
            admitted_at: now,
        };
        (running, self.job)
    }

    pub(crate) fn info(&self, now: Instant) -> TaskInfo {
        TaskInfo {
            id: self.id,
            seq: self.seq,
            label: self.label.clone(),
            submitted_at: self.submitted_wall,
            queued_ms: now.saturating_duration_since(self.submitted_at).as_millis() as u64,
            running_ms: None,
        }
    }
}

impl std::fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTask")
            .field("id", &self.id)
            .field("seq", &self.seq)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A task admitted into a tier's running set
#[derive(Debug, Clone)]
pub(crate) struct RunningTask {
    pub id: TaskId,
    pub seq: u64,
    pub label: String,
    pub submitted_at: Instant,
    pub submitted_wall: DateTime<Utc>,
    pub admitted_at: Instant,
}

impl RunningTask {
    pub(crate) fn info(&self, now: Instant) -> TaskInfo {
        TaskInfo {
            id: self.id,
            seq: self.seq,
            label: self.label.clone(),
            submitted_at: self.submitted_wall,
            queued_ms: self.admitted_at.saturating_duration_since(self.submitted_at).as_millis() as u64,
            running_ms: Some(now.saturating_duration_since(self.admitted_at).as_millis() as u64),
        }
    }
}

/// Description of a queued or running task, for inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskInfo {
    pub id: TaskId,
    /// Submission order, starting at 0
    pub seq: u64,
    pub label: String,
    pub submitted_at: DateTime<Utc>,
    /// Time spent in the pending queue
    pub queued_ms: u64,
    /// Time since admission; `None` while still queued
    pub running_ms: Option<u64>,
}

/// A tier's state at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSnapshot {
    pub kind: TierKind,
    pub quota: usize,
    pub refresh_ms: u64,
    /// Remaining time in the current window; `None` before the first admission
    pub window_remaining_ms: Option<u64>,
    /// Running tasks in admission order
    pub running: Vec<TaskInfo>,
}

/// Queued and in-flight work, for shutdown and persistence routines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimiterSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Pending tasks in FIFO order
    pub pending: Vec<TaskInfo>,
    /// Tiers in priority order
    pub tiers: Vec<TierSnapshot>,
}

impl LimiterSnapshot {
    pub fn total_running(&self) -> usize {
        self.tiers.iter().map(|tier| tier.running.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.total_running() == 0
    }

    pub fn tier(&self, kind: TierKind) -> Option<&TierSnapshot> {
        self.tiers.iter().find(|tier| tier.kind == kind)
    }
}

/// Counters for the limiter
///
/// Informational only; admission never reads them.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LimiterStats {
    pub total_submitted: u64,
    pub total_admitted: u64,
    pub admitted_sustained: u64,
    pub admitted_burst: u64,
    pub total_completed: u64,
    pub total_abandoned: u64,
    pub peak_queue_depth: usize,
    pub peak_running: usize,
}

impl LimiterStats {
    pub(crate) fn record_submitted(&mut self, queue_depth: usize) {
        self.total_submitted += 1;
        self.peak_queue_depth = self.peak_queue_depth.max(queue_depth);
    }

    pub(crate) fn record_admitted(&mut self, kind: TierKind, running: usize) {
        self.total_admitted += 1;
        match kind {
            TierKind::Sustained => self.admitted_sustained += 1,
            TierKind::Burst => self.admitted_burst += 1,
        }
        self.peak_running = self.peak_running.max(running);
    }

    pub(crate) fn record_finished(&mut self, settlement: Settlement) {
        self.total_completed += 1;
        if settlement == Settlement::Panicked {
            self.total_abandoned += 1;
        }
    }
}

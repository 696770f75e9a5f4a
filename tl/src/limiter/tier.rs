//! Admission tiers
//!
//! A tier bounds how many tasks may run at once and anchors a refresh window
//! that paces admissions after completions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error};

use super::config::TierConfig;
use super::queue::{RunningTask, TaskId, TierSnapshot};

/// Which tier a task was admitted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierKind {
    Sustained,
    Burst,
}

impl std::fmt::Display for TierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sustained => write!(f, "sustained"),
            Self::Burst => write!(f, "burst"),
        }
    }
}

impl std::str::FromStr for TierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sustained" => Ok(Self::Sustained),
            "burst" => Ok(Self::Burst),
            _ => Err(format!("Unknown tier: {}", s)),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Tier {
    kind: TierKind,
    quota: usize,
    refresh_window: Duration,
    /// Start of the current window; `None` until the first admission
    anchor: Option<Instant>,
    running: HashMap<TaskId, RunningTask>,
}

impl Tier {
    pub(crate) fn new(kind: TierKind, config: TierConfig) -> Self {
        Self {
            kind,
            quota: config.quota,
            refresh_window: config.refresh_window(),
            anchor: None,
            running: HashMap::with_capacity(config.quota),
        }
    }

    pub(crate) fn kind(&self) -> TierKind {
        self.kind
    }

    pub(crate) fn running_len(&self) -> usize {
        self.running.len()
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.running.len() < self.quota
    }

    #[cfg(test)]
    pub(crate) fn anchor(&self) -> Option<Instant> {
        self.anchor
    }

    /// Re-anchor the window if it is unset or has fully elapsed
    pub(crate) fn open_window(&mut self, now: Instant) {
        let expired = self
            .anchor
            .is_none_or(|anchor| now.saturating_duration_since(anchor) >= self.refresh_window);
        if expired {
            debug!(tier = %self.kind, "Tier::open_window: re-anchoring window");
            self.anchor = Some(now);
        }
    }

    pub(crate) fn admit(&mut self, task: RunningTask) {
        debug_assert!(self.has_capacity(), "{} tier admitted past its quota", self.kind);
        if !self.has_capacity() {
            error!(tier = %self.kind, quota = self.quota, "Tier::admit: admitting past quota");
        }
        self.running.insert(task.id, task);
    }

    /// Remove a running task by identity
    pub(crate) fn release(&mut self, id: TaskId) -> Option<RunningTask> {
        let removed = self.running.remove(&id);
        debug_assert!(removed.is_some(), "task {} was not running in the {} tier", id, self.kind);
        if removed.is_none() {
            error!(tier = %self.kind, %id, "Tier::release: task not found in running set");
        }
        removed
    }

    /// Time left in the current window, zero once it has elapsed
    pub(crate) fn pacing_delay(&self, now: Instant) -> Duration {
        match self.anchor {
            Some(anchor) => self
                .refresh_window
                .saturating_sub(now.saturating_duration_since(anchor)),
            None => Duration::ZERO,
        }
    }

    pub(crate) fn snapshot(&self, now: Instant) -> TierSnapshot {
        let mut running: Vec<&RunningTask> = self.running.values().collect();
        running.sort_by_key(|task| task.seq);

        TierSnapshot {
            kind: self.kind,
            quota: self.quota,
            refresh_ms: self.refresh_window.as_millis() as u64,
            window_remaining_ms: self.anchor.map(|_| self.pacing_delay(now).as_millis() as u64),
            running: running.into_iter().map(|task| task.info(now)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(seq: u64, now: Instant) -> RunningTask {
        RunningTask {
            id: TaskId::new(),
            seq,
            label: format!("task-{}", seq),
            submitted_at: now,
            submitted_wall: chrono::Utc::now(),
            admitted_at: now,
        }
    }

    #[test]
    fn test_tier_kind_display_and_parse() {
        assert_eq!(TierKind::Sustained.to_string(), "sustained");
        assert_eq!("BURST".parse::<TierKind>(), Ok(TierKind::Burst));
        assert!("extra".parse::<TierKind>().is_err());
    }

    #[test]
    fn test_first_admission_anchors_window() {
        let now = Instant::now();
        let mut tier = Tier::new(TierKind::Sustained, TierConfig::new(2, 1000));
        assert_eq!(tier.anchor(), None);

        tier.open_window(now);
        assert_eq!(tier.anchor(), Some(now));
    }

    #[test]
    fn test_open_window_keeps_anchor_inside_window() {
        let start = Instant::now();
        let mut tier = Tier::new(TierKind::Sustained, TierConfig::new(2, 1000));
        tier.open_window(start);

        tier.open_window(start + Duration::from_millis(999));
        assert_eq!(tier.anchor(), Some(start));

        let later = start + Duration::from_millis(1000);
        tier.open_window(later);
        assert_eq!(tier.anchor(), Some(later));
    }

    #[test]
    fn test_zero_window_always_reanchors() {
        let start = Instant::now();
        let mut tier = Tier::new(TierKind::Burst, TierConfig::new(1, 0));
        tier.open_window(start);
        tier.open_window(start);
        assert_eq!(tier.anchor(), Some(start));
        assert_eq!(tier.pacing_delay(start), Duration::ZERO);
    }

    #[test]
    fn test_pacing_delay_counts_down() {
        let start = Instant::now();
        let mut tier = Tier::new(TierKind::Sustained, TierConfig::new(2, 1000));
        assert_eq!(tier.pacing_delay(start), Duration::ZERO);

        tier.open_window(start);
        assert_eq!(tier.pacing_delay(start + Duration::from_millis(100)), Duration::from_millis(900));
        assert_eq!(tier.pacing_delay(start + Duration::from_millis(5000)), Duration::ZERO);
    }

    #[test]
    fn test_capacity_and_release_by_identity() {
        let now = Instant::now();
        let mut tier = Tier::new(TierKind::Sustained, TierConfig::new(2, 1000));
        let first = running(0, now);
        let second = running(1, now);
        let first_id = first.id;
        let second_id = second.id;

        tier.admit(first);
        assert!(tier.has_capacity());
        tier.admit(second);
        assert!(!tier.has_capacity());

        let removed = tier.release(second_id).unwrap();
        assert_eq!(removed.id, second_id);
        assert_eq!(tier.running_len(), 1);

        let snapshot = tier.snapshot(now);
        assert_eq!(snapshot.running.len(), 1);
        assert_eq!(snapshot.running[0].id, first_id);
    }

    #[test]
    fn test_snapshot_orders_by_admission() {
        let now = Instant::now();
        let mut tier = Tier::new(TierKind::Burst, TierConfig::new(3, 500));
        tier.open_window(now);
        for seq in [2, 0, 1] {
            tier.admit(running(seq, now));
        }

        let snapshot = tier.snapshot(now + Duration::from_millis(200));
        let labels: Vec<_> = snapshot.running.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["task-0", "task-1", "task-2"]);
        assert_eq!(snapshot.window_remaining_ms, Some(300));
        assert_eq!(snapshot.quota, 3);
    }
}

//! Synthetic workload for exercising a limiter
//!
//! Each task sleeps for a random duration and then succeeds or fails at a
//! configured rate. The report records when each task actually started,
//! relative to the moment the workload was submitted.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::limiter::{TaskError, TaskHandle, TaskId, TieredLimiter};

/// One planned synthetic task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTask {
    pub duration: Duration,
    pub fails: bool,
}

/// Timing observed from inside a synthetic task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timing {
    started: Duration,
    finished: Duration,
}

/// Outcome of a synthetic task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "detail")]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
    Abandoned,
}

/// Per-task line in a workload report
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub index: usize,
    pub id: TaskId,
    pub started_ms: Option<u64>,
    pub finished_ms: Option<u64>,
    pub outcome: TaskOutcome,
}

/// Draw a random plan from the simulation settings
pub fn plan(config: &SimulationConfig) -> Vec<PlannedTask> {
    let mut rng = rand::rng();
    (0..config.tasks)
        .map(|_| PlannedTask {
            duration: Duration::from_millis(rng.random_range(config.min_ms..=config.max_ms)),
            fails: rng.random_bool(config.fail_rate),
        })
        .collect()
}

/// Handles for a submitted workload
pub struct Submission {
    handles: Vec<(usize, TaskHandle<Timing, (Timing, String)>)>,
}

impl Submission {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every task and report how each one went
    pub async fn collect(self) -> Vec<TaskReport> {
        let mut reports = Vec::with_capacity(self.handles.len());
        for (index, handle) in self.handles {
            let id = handle.id();
            let (timing, outcome) = match handle.await {
                Ok(timing) => (Some(timing), TaskOutcome::Succeeded),
                Err(TaskError::Failed((timing, reason))) => (Some(timing), TaskOutcome::Failed(reason)),
                Err(TaskError::Abandoned) => (None, TaskOutcome::Abandoned),
            };
            reports.push(TaskReport {
                index,
                id,
                started_ms: timing.map(|t| t.started.as_millis() as u64),
                finished_ms: timing.map(|t| t.finished.as_millis() as u64),
                outcome,
            });
        }
        reports
    }
}

/// Submit every planned task to the limiter without waiting
pub fn submit(limiter: &TieredLimiter, tasks: &[PlannedTask]) -> Submission {
    debug!(count = tasks.len(), "workload::submit: called");
    let origin = Instant::now();

    let handles = tasks
        .iter()
        .copied()
        .enumerate()
        .map(|(index, task)| {
            let handle = limiter.submit_labeled(format!("sim-{}", index), move || execute(origin, task));
            (index, handle)
        })
        .collect();

    Submission { handles }
}

/// Submit every planned task and wait for all of them
pub async fn run(limiter: &TieredLimiter, tasks: &[PlannedTask]) -> Vec<TaskReport> {
    submit(limiter, tasks).collect().await
}

async fn execute(origin: Instant, task: PlannedTask) -> Result<Timing, (Timing, String)> {
    let started = origin.elapsed();
    tokio::time::sleep(task.duration).await;
    let timing = Timing {
        started,
        finished: origin.elapsed(),
    };
    if task.fails {
        Err((timing, format!("simulated failure after {}ms", task.duration.as_millis())))
    } else {
        Ok(timing)
    }
}

//! Limiter implementation

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{Notify, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::LimiterConfig;
use super::error::LimiterError;
use super::handle::TaskHandle;
use super::queue::{Job, LimiterSnapshot, LimiterStats, PendingTask, Settlement, TaskId};
use super::tier::{Tier, TierKind};

const DEFAULT_LABEL: &str = "task";

/// Internal state protected by mutex
struct LimiterInner {
    /// FIFO queue of waiting tasks
    pending: VecDeque<PendingTask>,

    /// Tiers in priority order, sustained first
    tiers: Vec<Tier>,

    /// Statistics
    stats: LimiterStats,
}

/// A task moved out of the queue, ready to launch
struct Admission {
    tier: usize,
    id: TaskId,
    job: Job,
}

impl LimiterInner {
    /// One dispatch attempt: admit the queue head into the first tier with room
    fn admit_next(&mut self, now: Instant) -> Option<Admission> {
        if self.pending.is_empty() {
            return None;
        }

        let Some(index) = self.tiers.iter().position(Tier::has_capacity) else {
            debug!(pending = self.pending.len(), "LimiterInner::admit_next: all tiers full");
            return None;
        };

        self.tiers[index].open_window(now);
        let task = self.pending.pop_front()?;
        let (running, job) = task.into_running(now);
        let id = running.id;
        let tier = &mut self.tiers[index];
        debug!(%id, tier = %tier.kind(), label = %running.label, "LimiterInner::admit_next: admitting");
        tier.admit(running);

        let kind = tier.kind();
        let total_running = self.running_len();
        self.stats.record_admitted(kind, total_running);

        Some(Admission { tier: index, id, job })
    }

    fn running_len(&self) -> usize {
        self.tiers.iter().map(Tier::running_len).sum()
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running_len() == 0
    }
}

struct Shared {
    inner: Mutex<LimiterInner>,
    config: LimiterConfig,
    /// Signalled whenever the limiter drains to idle
    idle: Notify,
}

/// Paces async work through a sustained tier and an optional burst tier.
///
/// Tasks are admitted strictly in submission order. The sustained tier gets
/// first refusal on free capacity; the burst tier only takes work while the
/// sustained tier is full. After a task settles, the next admission from its
/// tier waits out whatever remains of that tier's refresh window.
///
/// Cloning is cheap and every clone drives the same queue.
#[derive(Clone)]
pub struct TieredLimiter {
    shared: Arc<Shared>,
}

impl TieredLimiter {
    /// Create a new limiter, rejecting invalid configurations
    pub fn new(config: LimiterConfig) -> Result<Self, LimiterError> {
        debug!(?config, "TieredLimiter::new: called");
        config.validate()?;

        let tiers = config
            .tiers()
            .into_iter()
            .map(|(kind, tier)| Tier::new(kind, tier))
            .collect();

        info!(
            sustained_quota = config.sustained.quota,
            burst_quota = config.burst.map(|b| b.quota).unwrap_or(0),
            "Limiter created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(LimiterInner {
                    pending: VecDeque::new(),
                    tiers,
                    stats: LimiterStats::default(),
                }),
                config,
                idle: Notify::new(),
            }),
        })
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.shared.config
    }

    /// Submit an async operation
    ///
    /// Admitted operations run as spawned tasks.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, as `tokio::spawn` does. This
    /// holds for every `submit` form.
    pub fn submit<F, Fut, T, E>(&self, op: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit_labeled(DEFAULT_LABEL, op)
    }

    /// Submit an async operation, forwarding `args` to it unchanged
    pub fn submit_with<F, A, Fut, T, E>(&self, op: F, args: A) -> TaskHandle<T, E>
    where
        F: FnOnce(A) -> Fut + Send + 'static,
        A: Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit(move || op(args))
    }

    /// Submit a synchronous operation; its result settles the handle as soon
    /// as it is admitted and run
    pub fn submit_sync<F, T, E>(&self, op: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit(move || std::future::ready(op()))
    }

    /// Submit an async operation with a label shown in snapshots
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime while a tier has room, since
    /// admission spawns the operation immediately.
    pub fn submit_labeled<F, Fut, T, E>(&self, label: impl Into<String>, op: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let label = label.into();
        let id = TaskId::new();
        debug!(%id, %label, "TieredLimiter::submit_labeled: called");

        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                match AssertUnwindSafe(async move { op().await }).catch_unwind().await {
                    Ok(result) => {
                        // The caller may have dropped the handle; the outcome is discarded then.
                        let _ = tx.send(result);
                        Settlement::Settled
                    }
                    Err(_) => {
                        drop(tx);
                        Settlement::Panicked
                    }
                }
            }
            .boxed()
        });

        {
            let mut inner = self.lock();
            let seq = inner.stats.total_submitted;
            inner.pending.push_back(PendingTask::new(id, seq, label, job));
            let depth = inner.pending.len();
            inner.stats.record_submitted(depth);
        }

        self.dispatch();
        TaskHandle::new(id, rx)
    }

    /// Perform one dispatch attempt and launch whatever it admits
    fn dispatch(&self) {
        let admission = self.lock().admit_next(Instant::now());
        if let Some(admission) = admission {
            self.launch(admission);
        }
    }

    fn launch(&self, admission: Admission) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let Admission { tier, id, job } = admission;
            let settlement = job().await;
            limiter.complete(tier, id, settlement).await;
        });
    }

    /// Completion handling: the handle is already settled, so free the slot,
    /// wait out the tier's window, then try to admit again
    async fn complete(&self, tier: usize, id: TaskId, settlement: Settlement) {
        debug!(%id, ?settlement, "TieredLimiter::complete: called");
        if settlement == Settlement::Panicked {
            warn!(%id, "Task panicked, releasing its slot");
        }

        let delay = {
            let mut inner = self.lock();
            inner.tiers[tier].release(id);
            inner.stats.record_finished(settlement);

            if inner.is_idle() {
                debug!("TieredLimiter::complete: limiter drained");
                self.shared.idle.notify_waiters();
            }
            if inner.pending.is_empty() {
                debug!(%id, "TieredLimiter::complete: queue empty, nothing to dispatch");
                return;
            }
            inner.tiers[tier].pacing_delay(Instant::now())
        };

        if !delay.is_zero() {
            debug!(%id, ?delay, "TieredLimiter::complete: pacing before next dispatch");
            tokio::time::sleep(delay).await;
        }
        self.dispatch();
    }

    /// Wait until the queue is empty and nothing is running
    pub async fn wait_idle(&self) {
        debug!("TieredLimiter::wait_idle: called");
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Queued and in-flight work, in FIFO and admission order
    pub fn snapshot(&self) -> LimiterSnapshot {
        debug!("TieredLimiter::snapshot: called");
        let inner = self.lock();
        let now = Instant::now();
        LimiterSnapshot {
            taken_at: Utc::now(),
            pending: inner.pending.iter().map(|task| task.info(now)).collect(),
            tiers: inner.tiers.iter().map(|tier| tier.snapshot(now)).collect(),
        }
    }

    pub fn stats(&self) -> LimiterStats {
        self.lock().stats.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Tasks running across all tiers
    pub fn running_len(&self) -> usize {
        self.lock().running_len()
    }

    /// Tasks running in one tier; zero for a tier that is not configured
    pub fn running_in(&self, kind: TierKind) -> usize {
        self.lock()
            .tiers
            .iter()
            .find(|tier| tier.kind() == kind)
            .map(Tier::running_len)
            .unwrap_or(0)
    }

    /// Check if any admitted task has yet to settle
    pub fn has_running(&self) -> bool {
        self.running_len() > 0
    }

    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    fn lock(&self) -> MutexGuard<'_, LimiterInner> {
        // Bookkeeping never panics mid-update, so a poisoned lock still holds consistent state.
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TieredLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("TieredLimiter")
            .field("config", &self.shared.config)
            .field("pending", &inner.pending.len())
            .field("running", &inner.running_len())
            .finish()
    }
}

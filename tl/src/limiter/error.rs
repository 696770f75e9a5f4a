//! Limiter error types

use thiserror::Error;

use super::tier::TierKind;

/// Errors raised while constructing a limiter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("{tier} tier quota must be at least 1")]
    ZeroQuota { tier: TierKind },
}

/// Why a task's handle settled without a value
///
/// `Failed` carries the operation's own failure reason, untouched.
#[derive(Debug, Error)]
pub enum TaskError<E> {
    #[error("task failed: {0}")]
    Failed(E),

    #[error("task was abandoned before it settled")]
    Abandoned,
}

impl<E> TaskError<E> {
    /// Check if the operation itself reported the failure
    pub fn is_failed(&self) -> bool {
        matches!(self, TaskError::Failed(_))
    }

    /// Check if the task panicked or was dropped before settling
    pub fn is_abandoned(&self) -> bool {
        matches!(self, TaskError::Abandoned)
    }

    /// Get the operation's failure reason, if there is one
    pub fn into_failure(self) -> Option<E> {
        match self {
            TaskError::Failed(reason) => Some(reason),
            TaskError::Abandoned => None,
        }
    }
}

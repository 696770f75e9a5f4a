//! TaskHandle - the caller's side of a submitted task

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::error::TaskError;
use super::queue::TaskId;

/// Settles once with the outcome of a submitted operation
///
/// Resolves to `Ok(value)` on success, `Err(TaskError::Failed(reason))` when
/// the operation fails, and `Err(TaskError::Abandoned)` if the operation
/// panicked or was dropped without settling. Dropping the handle does not
/// cancel the task.
#[derive(Debug)]
pub struct TaskHandle<T, E> {
    id: TaskId,
    rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) fn new(id: TaskId, rx: oneshot::Receiver<Result<T, E>>) -> Self {
        Self { id, rx }
    }

    /// Identity assigned to the task at submission
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(reason)) => Err(TaskError::Failed(reason)),
            Err(_) => Err(TaskError::Abandoned),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_yields_value() {
        let (tx, rx) = oneshot::channel::<Result<u32, String>>();
        let handle = TaskHandle::new(TaskId::new(), rx);
        tx.send(Ok(42)).unwrap();
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_handle_yields_failure_verbatim() {
        let (tx, rx) = oneshot::channel::<Result<u32, String>>();
        let handle = TaskHandle::new(TaskId::new(), rx);
        tx.send(Err("boom".to_string())).unwrap();
        let err = handle.await.unwrap_err();
        assert_eq!(err.into_failure().as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_dropped_sender_is_abandoned() {
        let (tx, rx) = oneshot::channel::<Result<u32, String>>();
        let handle = TaskHandle::new(TaskId::new(), rx);
        drop(tx);
        assert!(handle.await.unwrap_err().is_abandoned());
    }
}

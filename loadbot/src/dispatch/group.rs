//! Supervised task group
//!
//! Members share a cancellation token derived from the caller's. The first
//! member to fail records its error and cancels the group; later errors are
//! discarded. External cancellation reaches every member through the parent
//! token, while group cancellation never propagates back to the parent.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::error;

use super::types::DispatchError;

type ErrorSlot = Arc<Mutex<Option<DispatchError>>>;

/// A set of concurrently running tasks with first-error-wins semantics
#[derive(Debug)]
pub struct TaskGroup {
    tasks: JoinSet<()>,
    token: CancellationToken,
    first_error: ErrorSlot,
}

impl TaskGroup {
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            token: parent.child_token(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Token cancelled on external cancellation or on the first member failure
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Number of members not yet joined
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run `task` as a member of the group
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), DispatchError>> + Send + 'static,
    {
        let token = self.token.clone();
        let first_error = Arc::clone(&self.first_error);
        self.tasks.spawn(async move {
            if let Err(err) = task.await {
                record(&first_error, err);
                token.cancel();
            }
        });
    }

    /// Join every member and return the first recorded error
    pub async fn wait(mut self) -> Result<(), DispatchError> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(join_err) = joined {
                error!("Task join error: {}", join_err);
                record(
                    &self.first_error,
                    DispatchError::WorkerPanicked(join_err.to_string()),
                );
                self.token.cancel();
            }
        }
        self.token.cancel();

        let first = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn record(slot: &Mutex<Option<DispatchError>>, err: DispatchError) {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_none() {
        *slot = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionError;
    use alloy_primitives::Address;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn submit_error(byte: u8, reason: &str) -> DispatchError {
        DispatchError::Submit {
            from: Address::repeat_byte(byte),
            source: ConnectionError::Rejected(reason.to_string()),
        }
    }

    async fn explode() -> Result<(), DispatchError> {
        panic!("worker blew up")
    }

    #[tokio::test]
    async fn test_empty_group_succeeds() {
        let group = TaskGroup::new(&CancellationToken::new());
        assert!(group.is_empty());
        assert!(group.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_successful_members() {
        let mut group = TaskGroup::new(&CancellationToken::new());
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let done = done.clone();
            group.spawn(async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(group.len(), 10);

        assert!(group.wait().await.is_ok());
        assert_eq!(done.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_error_wins_and_cancels_siblings() {
        let parent = CancellationToken::new();
        let mut group = TaskGroup::new(&parent);

        group.spawn(async {
            sleep(Duration::from_millis(10)).await;
            Err(submit_error(1, "first"))
        });
        group.spawn(async {
            sleep(Duration::from_millis(20)).await;
            Err(submit_error(2, "second"))
        });

        let observed_cancel = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let token = group.token().clone();
            let observed_cancel = observed_cancel.clone();
            group.spawn(async move {
                token.cancelled().await;
                observed_cancel.fetch_add(1, Ordering::SeqCst);
                Err(DispatchError::Cancelled)
            });
        }

        match group.wait().await {
            Err(DispatchError::Submit { from, source }) => {
                assert_eq!(from, Address::repeat_byte(1));
                assert_eq!(source, ConnectionError::Rejected("first".to_string()));
            }
            other => panic!("Expected the first submit error, got {other:?}"),
        }
        assert_eq!(observed_cancel.load(Ordering::SeqCst), 5);
        assert!(
            !parent.is_cancelled(),
            "Group failure must not cancel the parent token"
        );
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_members() {
        let parent = CancellationToken::new();
        let mut group = TaskGroup::new(&parent);
        for _ in 0..3 {
            let token = group.token().clone();
            group.spawn(async move {
                token.cancelled().await;
                Err(DispatchError::Cancelled)
            });
        }

        parent.cancel();
        assert!(matches!(group.wait().await, Err(DispatchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_panicking_member_fails_group() {
        let mut group = TaskGroup::new(&CancellationToken::new());
        let token = group.token().clone();
        group.spawn(explode());
        group.spawn(async move {
            token.cancelled().await;
            Err(DispatchError::Cancelled)
        });

        let result = group.wait().await;
        assert!(
            matches!(result, Err(DispatchError::WorkerPanicked(_))),
            "Expected WorkerPanicked, got {result:?}"
        );
    }
}

//! Store-backed cancellation.

use crate::agent::ports::CancellationCheck;
use crate::task::{
    domain::{TaskId, TaskStatus, UserId},
    ports::TaskStore,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Reports cancellation once a user stop has reached the store.
///
/// A task that disappeared, for example through deletion, also counts as
/// cancelled. Store failures are logged and do not cancel the run.
pub struct StoredCancellation<S>
where
    S: TaskStore,
{
    store: Arc<S>,
    task_id: TaskId,
    owner: UserId,
}

impl<S> StoredCancellation<S>
where
    S: TaskStore,
{
    /// Watches `task_id` as seen by `owner`.
    #[must_use]
    pub const fn new(store: Arc<S>, task_id: TaskId, owner: UserId) -> Self {
        Self {
            store,
            task_id,
            owner,
        }
    }
}

#[async_trait]
impl<S> CancellationCheck for StoredCancellation<S>
where
    S: TaskStore,
{
    async fn is_cancelled(&self) -> bool {
        match self.store.get_task(&self.task_id, &self.owner).await {
            Ok(Some(task)) => task.status() == TaskStatus::Cancelled,
            Ok(None) => true,
            Err(err) => {
                warn!(task_id = %self.task_id, error = %err, "cancellation check failed");
                false
            }
        }
    }
}

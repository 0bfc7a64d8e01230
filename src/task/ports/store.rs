//! Store port for task and message persistence.

use crate::task::domain::{
    LogEntry, MessageId, Task, TaskChanges, TaskDomainError, TaskId, TaskMessage, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Durable task and message persistence contract.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicateTask`] when the identifier is taken.
    async fn create_task(&self, task: &Task) -> TaskStoreResult<()>;

    /// Finds a live task owned by `owner`.
    ///
    /// Returns `None` when the task does not exist, belongs to another user,
    /// or has been soft-deleted.
    async fn get_task(&self, id: &TaskId, owner: &UserId) -> TaskStoreResult<Option<Task>>;

    /// Applies a partial update atomically and returns the updated task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist and
    /// [`TaskStoreError::Domain`] when the task rejects the change.
    async fn update_task(&self, id: &TaskId, changes: TaskChanges) -> TaskStoreResult<Task>;

    /// Appends entries to the task log, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn append_log_entries(&self, id: &TaskId, entries: Vec<LogEntry>)
    -> TaskStoreResult<()>;

    /// Lists live tasks owned by `owner`, newest first.
    async fn list_tasks_for_user(&self, owner: &UserId) -> TaskStoreResult<Vec<Task>>;

    /// Stores a new message.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the owning task does not
    /// exist.
    async fn create_message(&self, message: &TaskMessage) -> TaskStoreResult<()>;

    /// Replaces the content of an existing message.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::MessageNotFound`] when the message does not
    /// exist.
    async fn update_message_content(&self, id: MessageId, content: &str) -> TaskStoreResult<()>;

    /// Lists messages of a task in creation order.
    async fn list_messages(&self, task_id: &TaskId) -> TaskStoreResult<Vec<TaskMessage>>;

    /// Counts tasks created by `owner` at or after `since`, soft-deleted
    /// tasks included.
    async fn count_tasks_created_since(
        &self,
        owner: &UserId,
        since: DateTime<Utc>,
    ) -> TaskStoreResult<u32>;

    /// Counts user-authored messages on `owner`'s tasks at or after `since`.
    async fn count_user_messages_since(
        &self,
        owner: &UserId,
        since: DateTime<Utc>,
    ) -> TaskStoreResult<u32>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The message was not found.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// The task rejected the requested change.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

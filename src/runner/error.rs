//! Runner errors.

use crate::credentials::domain::CredentialError;
use crate::task::{
    domain::{TaskId, TaskStatus},
    ports::TaskStoreError,
};
use thiserror::Error;

/// Errors that prevent a run from starting or finishing its bookkeeping.
///
/// Step failures inside a run are not errors: they move the task to
/// `ERROR` and the run returns the final status.
#[derive(Debug, Clone, Error)]
pub enum RunnerError {
    /// The task does not exist for this owner.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Only pending tasks can be started.
    #[error("task {task_id} is {status}, expected PENDING")]
    NotPending {
        /// Task that was requested.
        task_id: TaskId,
        /// Its current status.
        status: TaskStatus,
    },

    /// Follow-ups need a finished keep-alive task.
    #[error("task {task_id} does not accept follow-ups while {status}")]
    FollowUpUnavailable {
        /// Task that was requested.
        task_id: TaskId,
        /// Its current status.
        status: TaskStatus,
    },

    /// The task's sandbox is gone.
    #[error("sandbox for task {0} is unavailable")]
    SandboxUnavailable(TaskId),

    /// Credentials could not be resolved.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// A follow-up step failed.
    #[error("follow-up failed: {0}")]
    FollowUpFailed(String),

    /// The task store failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

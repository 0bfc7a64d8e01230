//! Error types for task domain validation and parsing.

use super::{BranchName, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task identifier is malformed.
    #[error("invalid task identifier '{0}'")]
    InvalidTaskId(String),

    /// The user identifier is empty after trimming.
    #[error("user identifier must not be empty")]
    EmptyUserId,

    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// The repository URL is not an HTTPS `owner/repo` URL.
    #[error("invalid repository URL '{0}', expected https://host/owner/repo")]
    InvalidRepositoryUrl(String),

    /// The task prompt is empty after trimming.
    #[error("task prompt must not be empty")]
    EmptyPrompt,

    /// The requested maximum duration is outside the accepted range.
    #[error("maximum duration {minutes} minutes is outside 1..={limit}")]
    InvalidMaxDuration {
        /// Requested duration in minutes.
        minutes: u32,
        /// Largest accepted duration in minutes.
        limit: u32,
    },

    /// The branch name violates the branch naming rules.
    #[error("invalid branch name '{0}'")]
    InvalidBranchName(String),

    /// A different branch name is already assigned to the task.
    #[error("task {task_id} already has branch '{existing}'")]
    BranchAlreadyAssigned {
        /// Task identifier.
        task_id: TaskId,
        /// Branch name already recorded on the task.
        existing: BranchName,
    },

    /// The pull request number is invalid.
    #[error("invalid pull request number {0}, expected a positive integer")]
    InvalidPullRequestNumber(u64),

    /// The requested state transition is not permitted.
    #[error("invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Task identifier.
        task_id: TaskId,
        /// Current state.
        from: TaskStatus,
        /// Requested target state.
        to: TaskStatus,
    },

    /// The task has been soft-deleted and can no longer change.
    #[error("task {0} has been deleted")]
    TaskDeleted(TaskId),

    /// The task still has a live sandbox binding.
    #[error("task {0} still has a sandbox bound to it")]
    SandboxStillBound(TaskId),
}

/// Error returned while parsing task states from persistence or requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing pull request states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown pull request status: {0}")]
pub struct ParsePullRequestStatusError(pub String);

/// Error returned while parsing message roles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown message role: {0}")]
pub struct ParseMessageRoleError(pub String);

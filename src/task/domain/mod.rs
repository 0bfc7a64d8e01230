//! Domain model for task lifecycle management.
//!
//! The task domain models the task state machine, partial updates, branch
//! and pull request records, log entries and task messages while keeping all
//! infrastructure concerns outside of the domain boundary.

mod branch;
mod changes;
mod error;
mod ids;
mod log;
mod message;
mod pull_request;
mod task;

pub use branch::BranchName;
pub use changes::TaskChanges;
pub use error::{
    ParseMessageRoleError, ParsePullRequestStatusError, ParseTaskStatusError, TaskDomainError,
};
pub use ids::{MessageId, RepositoryFullName, TaskId, UserId};
pub use log::{LogEntry, LogLevel};
pub use message::{MessageRole, TaskMessage};
pub use pull_request::{MergeMethod, PullRequestNumber, PullRequestRecord, PullRequestStatus};
pub use task::{
    DEFAULT_MAX_DURATION_MINUTES, MAX_PROGRESS, PersistedTaskData, SandboxBinding, Task,
    TaskSpec, TaskStatus,
};

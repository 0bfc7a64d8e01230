//! Partial task updates applied atomically by the store.

use super::{BranchName, PullRequestRecord, SandboxBinding, TaskStatus};

/// A set of field changes for one task.
///
/// Stores apply the whole value under a single write so that a user stop
/// and a runner write cannot interleave field by field.
///
/// # Examples
///
///     use foreman::task::domain::{TaskChanges, TaskStatus};
///
///     let changes = TaskChanges::new()
///         .with_status(TaskStatus::Processing)
///         .with_progress(5);
///     assert!(!changes.is_empty());
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub(super) status: Option<TaskStatus>,
    pub(super) progress: Option<u8>,
    pub(super) error: Option<String>,
    pub(super) branch_name: Option<BranchName>,
    pub(super) sandbox: Option<Option<SandboxBinding>>,
    pub(super) pull_request: Option<PullRequestRecord>,
    pub(super) agent_session_id: Option<String>,
    pub(super) deleted: bool,
}

impl TaskChanges {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a status transition.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Reports progress. Lower values than the stored one are ignored.
    #[must_use]
    pub const fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Records the last error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Assigns the task branch.
    #[must_use]
    pub fn with_branch_name(mut self, branch: BranchName) -> Self {
        self.branch_name = Some(branch);
        self
    }

    /// Binds a live sandbox to the task.
    #[must_use]
    pub fn with_sandbox(mut self, binding: SandboxBinding) -> Self {
        self.sandbox = Some(Some(binding));
        self
    }

    /// Clears the sandbox binding.
    #[must_use]
    pub fn clear_sandbox(mut self) -> Self {
        self.sandbox = Some(None);
        self
    }

    /// Records pull request details.
    #[must_use]
    pub fn with_pull_request(mut self, pull_request: PullRequestRecord) -> Self {
        self.pull_request = Some(pull_request);
        self
    }

    /// Records a resumable agent session.
    #[must_use]
    pub fn with_agent_session(mut self, session_id: impl Into<String>) -> Self {
        self.agent_session_id = Some(session_id.into());
        self
    }

    /// Soft-deletes the task.
    #[must_use]
    pub const fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Returns the requested status, if any.
    #[must_use]
    pub const fn status(&self) -> Option<TaskStatus> {
        self.status
    }

    /// Returns `true` when nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.error.is_none()
            && self.branch_name.is_none()
            && self.sandbox.is_none()
            && self.pull_request.is_none()
            && self.agent_session_id.is_none()
            && !self.deleted
    }
}

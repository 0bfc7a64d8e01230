//! Task aggregate root and related task lifecycle types.

use super::{
    BranchName, LogEntry, ParseTaskStatusError, PullRequestRecord, RepositoryFullName,
    TaskChanges, TaskDomainError, TaskId, UserId,
};
use crate::agent::domain::AgentKind;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest progress value a task can report.
pub const MAX_PROGRESS: u8 = 100;

/// Task lifecycle status.
///
/// `Pending` is the only initial state. `Completed`, `Error` and `Cancelled`
/// are terminal and accept no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task has been created but the runner has not started.
    Pending,
    /// The runner is driving the task.
    Processing,
    /// The agent run and any commit or push succeeded.
    Completed,
    /// An unrecoverable step failed.
    Error,
    /// A user stopped the task.
    Cancelled,
}

impl TaskStatus {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns `true` for states that accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    /// Returns whether the state machine permits moving to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Processing)
                | (
                    Self::Processing,
                    Self::Completed | Self::Error | Self::Cancelled
                )
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, ParseTaskStatusError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "ERROR" => Ok(Self::Error),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Live sandbox recorded on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxBinding {
    /// Provider-side sandbox identifier, used to reconnect.
    pub sandbox_id: String,
    /// Externally reachable URL of the sandbox.
    pub sandbox_url: String,
}

/// Creation parameters for a task.
///
/// # Examples
///
///     use foreman::agent::domain::AgentKind;
///     use foreman::task::domain::{TaskSpec, UserId};
///
///     let spec = TaskSpec::new(
///         UserId::new("user-1").expect("valid user"),
///         "add a health endpoint",
///         "https://github.com/acme/app",
///         AgentKind::Claude,
///     )
///     .with_keep_alive(true);
///     assert!(spec.keep_alive());
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    id: Option<TaskId>,
    user_id: UserId,
    prompt: String,
    repo_url: String,
    selected_agent: AgentKind,
    selected_model: Option<String>,
    install_dependencies: bool,
    max_duration_minutes: u32,
    keep_alive: bool,
}

/// Default maximum duration for a task run in minutes.
pub const DEFAULT_MAX_DURATION_MINUTES: u32 = 60;

impl TaskSpec {
    /// Creates a specification with default options.
    #[must_use]
    pub fn new(
        user_id: UserId,
        prompt: impl Into<String>,
        repo_url: impl Into<String>,
        selected_agent: AgentKind,
    ) -> Self {
        Self {
            id: None,
            user_id,
            prompt: prompt.into(),
            repo_url: repo_url.into(),
            selected_agent,
            selected_model: None,
            install_dependencies: false,
            max_duration_minutes: DEFAULT_MAX_DURATION_MINUTES,
            keep_alive: false,
        }
    }

    /// Uses a client-assigned task identifier.
    #[must_use]
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    /// Selects a model for the agent.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.selected_model = Some(model.into());
        self
    }

    /// Enables dependency installation before the agent runs.
    #[must_use]
    pub const fn with_install_dependencies(mut self, install: bool) -> Self {
        self.install_dependencies = install;
        self
    }

    /// Sets the maximum run duration.
    #[must_use]
    pub const fn with_max_duration_minutes(mut self, minutes: u32) -> Self {
        self.max_duration_minutes = minutes;
        self
    }

    /// Keeps the sandbox alive after the run.
    #[must_use]
    pub const fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the keep-alive flag.
    #[must_use]
    pub const fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    user_id: UserId,
    prompt: String,
    repo_url: String,
    repository: RepositoryFullName,
    selected_agent: AgentKind,
    selected_model: Option<String>,
    install_dependencies: bool,
    max_duration_minutes: u32,
    keep_alive: bool,
    status: TaskStatus,
    progress: u8,
    logs: Vec<LogEntry>,
    error: Option<String>,
    branch_name: Option<BranchName>,
    sandbox: Option<SandboxBinding>,
    pull_request: Option<PullRequestRecord>,
    agent_session_id: Option<String>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Owning user.
    pub user_id: UserId,
    /// Instruction for the agent.
    pub prompt: String,
    /// Source repository URL.
    pub repo_url: String,
    /// Selected agent backend.
    pub selected_agent: AgentKind,
    /// Selected model, if any.
    pub selected_model: Option<String>,
    /// Whether dependencies are installed before the agent runs.
    pub install_dependencies: bool,
    /// Maximum run duration in minutes.
    pub max_duration_minutes: u32,
    /// Whether the sandbox survives the run.
    pub keep_alive: bool,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted progress.
    pub progress: u8,
    /// Persisted log entries.
    pub logs: Vec<LogEntry>,
    /// Last error message.
    pub error: Option<String>,
    /// Assigned branch.
    pub branch_name: Option<BranchName>,
    /// Live sandbox binding.
    pub sandbox: Option<SandboxBinding>,
    /// Pull request record.
    pub pull_request: Option<PullRequestRecord>,
    /// Last resumable agent session.
    pub agent_session_id: Option<String>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest change timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal transition timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new `Pending` task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyPrompt`] for a blank prompt,
    /// [`TaskDomainError::InvalidRepositoryUrl`] for a repository URL that
    /// does not name `owner/repo`, and
    /// [`TaskDomainError::InvalidMaxDuration`] when the duration is zero or
    /// exceeds `max_duration_limit`.
    pub fn create(
        spec: TaskSpec,
        max_duration_limit: u32,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let prompt = spec.prompt.trim();
        if prompt.is_empty() {
            return Err(TaskDomainError::EmptyPrompt);
        }
        if spec.max_duration_minutes == 0 || spec.max_duration_minutes > max_duration_limit {
            return Err(TaskDomainError::InvalidMaxDuration {
                minutes: spec.max_duration_minutes,
                limit: max_duration_limit,
            });
        }
        let repository = RepositoryFullName::from_url(&spec.repo_url)?;
        let timestamp = clock.utc();

        Ok(Self {
            id: spec.id.unwrap_or_else(TaskId::generate),
            user_id: spec.user_id,
            prompt: prompt.to_owned(),
            repo_url: spec.repo_url.trim().to_owned(),
            repository,
            selected_agent: spec.selected_agent,
            selected_model: spec.selected_model.filter(|model| !model.trim().is_empty()),
            install_dependencies: spec.install_dependencies,
            max_duration_minutes: spec.max_duration_minutes,
            keep_alive: spec.keep_alive,
            status: TaskStatus::Pending,
            progress: 0,
            logs: Vec::new(),
            error: None,
            branch_name: None,
            sandbox: None,
            pull_request: None,
            agent_session_id: None,
            deleted_at: None,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at: None,
        })
    }

    /// Reconstructs a task from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidRepositoryUrl`] when the stored
    /// repository URL is malformed.
    pub fn from_persisted(data: PersistedTaskData) -> Result<Self, TaskDomainError> {
        let repository = RepositoryFullName::from_url(&data.repo_url)?;
        Ok(Self {
            id: data.id,
            user_id: data.user_id,
            prompt: data.prompt,
            repo_url: data.repo_url,
            repository,
            selected_agent: data.selected_agent,
            selected_model: data.selected_model,
            install_dependencies: data.install_dependencies,
            max_duration_minutes: data.max_duration_minutes,
            keep_alive: data.keep_alive,
            status: data.status,
            progress: data.progress.min(MAX_PROGRESS),
            logs: data.logs,
            error: data.error,
            branch_name: data.branch_name,
            sandbox: data.sandbox,
            pull_request: data.pull_request,
            agent_session_id: data.agent_session_id,
            deleted_at: data.deleted_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
            completed_at: data.completed_at,
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the agent instruction.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the source repository URL.
    #[must_use]
    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    /// Returns the repository in `owner/repo` form.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the selected agent backend.
    #[must_use]
    pub const fn selected_agent(&self) -> AgentKind {
        self.selected_agent
    }

    /// Returns the selected model, if any.
    #[must_use]
    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    /// Returns whether dependencies are installed before the agent runs.
    #[must_use]
    pub const fn install_dependencies(&self) -> bool {
        self.install_dependencies
    }

    /// Returns the maximum run duration in minutes.
    #[must_use]
    pub const fn max_duration_minutes(&self) -> u32 {
        self.max_duration_minutes
    }

    /// Returns whether the sandbox survives the run.
    #[must_use]
    pub const fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the progress percentage.
    #[must_use]
    pub const fn progress(&self) -> u8 {
        self.progress
    }

    /// Returns the ordered log entries.
    #[must_use]
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Returns the last error message.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the assigned branch, if any.
    #[must_use]
    pub const fn branch_name(&self) -> Option<&BranchName> {
        self.branch_name.as_ref()
    }

    /// Returns the live sandbox binding, if any.
    #[must_use]
    pub const fn sandbox(&self) -> Option<&SandboxBinding> {
        self.sandbox.as_ref()
    }

    /// Returns the pull request record, if any.
    #[must_use]
    pub const fn pull_request(&self) -> Option<&PullRequestRecord> {
        self.pull_request.as_ref()
    }

    /// Returns the last resumable agent session.
    #[must_use]
    pub fn agent_session_id(&self) -> Option<&str> {
        self.agent_session_id.as_deref()
    }

    /// Returns `true` once the task has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the soft-delete timestamp.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the terminal transition timestamp.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Applies a partial update atomically.
    ///
    /// Every change is validated before any field is written, so a rejected
    /// update leaves the task untouched. Progress never decreases and a
    /// branch name, once assigned, cannot change.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TaskDeleted`] for soft-deleted tasks,
    /// [`TaskDomainError::InvalidStateTransition`] for edges outside the
    /// state machine, [`TaskDomainError::BranchAlreadyAssigned`] when a
    /// different branch is already recorded, and
    /// [`TaskDomainError::SandboxStillBound`] when deleting a task whose
    /// sandbox binding would survive the update.
    pub fn apply_changes(
        &mut self,
        changes: TaskChanges,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.validate_changes(&changes)?;

        let timestamp = clock.utc();
        if let Some(target) = changes.status {
            self.status = target;
            if target.is_terminal() {
                self.completed_at = Some(timestamp);
            }
        }
        if let Some(progress) = changes.progress {
            self.progress = self.progress.max(progress.min(MAX_PROGRESS));
        }
        if let Some(binding) = changes.sandbox {
            self.sandbox = binding;
        }
        self.error = changes.error.or_else(|| self.error.take());
        self.branch_name = changes.branch_name.or_else(|| self.branch_name.take());
        self.pull_request = changes.pull_request.or_else(|| self.pull_request.take());
        self.agent_session_id = changes
            .agent_session_id
            .or_else(|| self.agent_session_id.take());
        if changes.deleted {
            self.deleted_at = Some(timestamp);
        }
        self.updated_at = timestamp;
        Ok(())
    }

    fn validate_changes(&self, changes: &TaskChanges) -> Result<(), TaskDomainError> {
        if self.is_deleted() {
            return Err(TaskDomainError::TaskDeleted(self.id.clone()));
        }
        if let Some(target) = changes.status
            && !self.status.can_transition_to(target)
        {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id.clone(),
                from: self.status,
                to: target,
            });
        }
        if let (Some(existing), Some(requested)) = (&self.branch_name, &changes.branch_name)
            && existing != requested
        {
            return Err(TaskDomainError::BranchAlreadyAssigned {
                task_id: self.id.clone(),
                existing: existing.clone(),
            });
        }
        let sandbox_after = changes
            .sandbox
            .as_ref()
            .map_or(self.sandbox.as_ref(), Option::as_ref);
        if changes.deleted && sandbox_after.is_some() {
            return Err(TaskDomainError::SandboxStillBound(self.id.clone()));
        }
        Ok(())
    }

    /// Appends log entries in order.
    pub fn append_logs(&mut self, entries: impl IntoIterator<Item = LogEntry>, clock: &impl Clock) {
        self.logs.extend(entries);
        self.updated_at = clock.utc();
    }
}

//! Request-side task control: create, stop, retry, delete, reconnect and
//! follow-up.

use crate::agent::domain::AgentKind;
use crate::rate_limit::{RateLimitError, RateLimitStatus, RateLimiter};
use crate::runner::{DispatchError, RunRequest, TaskDispatcher, TaskSettings};
use crate::sandbox::{ports::SandboxProvider, services::SandboxManager};
use crate::task::{
    domain::{
        LogEntry, LogLevel, MessageRole, SandboxBinding, Task, TaskChanges, TaskDomainError,
        TaskId, TaskMessage, TaskSpec, TaskStatus, UserId,
    },
    ports::{SessionIdentity, TaskStore, TaskStoreError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    id: Option<TaskId>,
    prompt: String,
    repo_url: String,
    agent: AgentKind,
    model: Option<String>,
    install_dependencies: bool,
    max_duration_minutes: Option<u32>,
    keep_alive: bool,
}

impl CreateTaskRequest {
    /// Creates a request with default options.
    #[must_use]
    pub fn new(prompt: impl Into<String>, repo_url: impl Into<String>, agent: AgentKind) -> Self {
        Self {
            id: None,
            prompt: prompt.into(),
            repo_url: repo_url.into(),
            agent,
            model: None,
            install_dependencies: false,
            max_duration_minutes: None,
            keep_alive: false,
        }
    }

    /// Uses a client-assigned identifier.
    #[must_use]
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    /// Selects a model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Installs dependencies before the agent runs.
    #[must_use]
    pub const fn with_install_dependencies(mut self, install: bool) -> Self {
        self.install_dependencies = install;
        self
    }

    /// Overrides the configured default duration.
    #[must_use]
    pub const fn with_max_duration_minutes(mut self, minutes: u32) -> Self {
        self.max_duration_minutes = Some(minutes);
        self
    }

    /// Keeps the sandbox after the run.
    #[must_use]
    pub const fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    fn into_spec(self, owner: UserId, default_minutes: u32) -> TaskSpec {
        let mut spec = TaskSpec::new(owner, self.prompt, self.repo_url, self.agent)
            .with_install_dependencies(self.install_dependencies)
            .with_max_duration_minutes(self.max_duration_minutes.unwrap_or(default_minutes))
            .with_keep_alive(self.keep_alive);
        if let Some(id) = self.id {
            spec = spec.with_id(id);
        }
        if let Some(model) = self.model {
            spec = spec.with_model(model);
        }
        spec
    }
}

/// Errors returned by [`TaskControlService`].
#[derive(Debug, Clone, Error)]
pub enum TaskControlError {
    /// The request carries no authenticated user.
    #[error("authentication required")]
    Unauthenticated,

    /// The user's daily quota is spent.
    #[error("daily limit of {} requests reached; resets at {}", .0.total, .0.reset_at)]
    RateLimited(RateLimitStatus),

    /// The task does not exist or belongs to someone else.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task is not in a state the action applies to.
    #[error("cannot {action} task {task_id} while it is {status}")]
    InvalidState {
        /// Task identifier.
        task_id: TaskId,
        /// Requested action.
        action: &'static str,
        /// Current status.
        status: TaskStatus,
    },

    /// A follow-up instruction was blank.
    #[error("follow-up instruction must not be empty")]
    EmptyInstruction,

    /// The task has no reachable sandbox.
    #[error("sandbox for task {0} is unavailable")]
    SandboxUnavailable(TaskId),

    /// Input failed domain validation.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),

    /// Quota evaluation failed.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// The run could not be queued. The task stays `PENDING`.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result type for control operations.
pub type TaskControlResult<T> = Result<T, TaskControlError>;

/// Handles user-initiated task actions.
///
/// Every operation authenticates through a [`SessionIdentity`] and only sees
/// tasks the caller owns. Runs are queued through a [`TaskDispatcher`] and
/// never awaited.
pub struct TaskControlService<S, P, C>
where
    S: TaskStore,
    P: SandboxProvider + 'static,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    sandboxes: Arc<SandboxManager<P>>,
    limiter: RateLimiter<S, C>,
    dispatcher: Arc<dyn TaskDispatcher>,
    clock: Arc<C>,
    settings: TaskSettings,
}

impl<S, P, C> TaskControlService<S, P, C>
where
    S: TaskStore,
    P: SandboxProvider + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a control service.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        sandboxes: Arc<SandboxManager<P>>,
        limiter: RateLimiter<S, C>,
        dispatcher: Arc<dyn TaskDispatcher>,
        clock: Arc<C>,
        settings: TaskSettings,
    ) -> Self {
        Self {
            store,
            sandboxes,
            limiter,
            dispatcher,
            clock,
            settings,
        }
    }

    /// Validates and persists a `PENDING` task, then queues its run.
    ///
    /// # Errors
    ///
    /// Returns [`TaskControlError::Unauthenticated`],
    /// [`TaskControlError::RateLimited`], [`TaskControlError::Domain`] for
    /// invalid input, or the store or dispatch failure.
    #[instrument(skip_all)]
    pub async fn create(
        &self,
        identity: &dyn SessionIdentity,
        request: CreateTaskRequest,
    ) -> TaskControlResult<Task> {
        let owner = authenticate(identity).await?;
        self.ensure_quota(&owner).await?;
        let spec = request.into_spec(owner, self.settings.default_max_duration_minutes);
        self.persist_and_dispatch(spec).await
    }

    /// Creates a fresh task from a finished one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskControlError::InvalidState`] unless the source task is
    /// terminal, plus the errors of [`Self::create`].
    #[instrument(skip_all, fields(task_id = %task_id))]
    pub async fn retry(
        &self,
        identity: &dyn SessionIdentity,
        task_id: &TaskId,
    ) -> TaskControlResult<Task> {
        let owner = authenticate(identity).await?;
        let source = self.load(task_id, &owner).await?;
        if !source.status().is_terminal() {
            return Err(invalid_state(&source, "retry"));
        }
        self.ensure_quota(&owner).await?;
        let mut spec = TaskSpec::new(
            owner,
            source.prompt(),
            source.repo_url(),
            source.selected_agent(),
        )
        .with_install_dependencies(source.install_dependencies())
        .with_max_duration_minutes(source.max_duration_minutes())
        .with_keep_alive(source.keep_alive());
        if let Some(model) = source.selected_model() {
            spec = spec.with_model(model);
        }
        self.persist_and_dispatch(spec).await
    }

    /// Stops a task.
    ///
    /// A `PROCESSING` task moves to `CANCELLED`; the runner notices at its
    /// next checkpoint. A finished keep-alive task keeps its status and only
    /// loses its sandbox. In both cases the sandbox is torn down and the
    /// binding cleared.
    ///
    /// # Errors
    ///
    /// Returns [`TaskControlError::InvalidState`] for `PENDING` tasks and
    /// finished tasks without a sandbox.
    #[instrument(skip_all, fields(task_id = %task_id))]
    pub async fn stop(
        &self,
        identity: &dyn SessionIdentity,
        task_id: &TaskId,
    ) -> TaskControlResult<Task> {
        let owner = authenticate(identity).await?;
        let task = self.load(task_id, &owner).await?;
        let changes = match task.status() {
            TaskStatus::Processing => TaskChanges::new()
                .with_status(TaskStatus::Cancelled)
                .clear_sandbox(),
            status if status.is_terminal() && task.sandbox().is_some() => {
                TaskChanges::new().clear_sandbox()
            }
            _ => return Err(invalid_state(&task, "stop")),
        };
        let updated = self.store.update_task(task_id, changes).await?;
        self.release(&task).await;
        self.log(task_id, LogLevel::Info, "Task stopped by user").await;
        info!(status = %updated.status(), "task stopped");
        Ok(updated)
    }

    /// Tears down any sandbox and soft-deletes the task.
    ///
    /// A running task is cancelled first so its runner halts at the next
    /// checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TaskControlError::NotFound`] or a store failure.
    #[instrument(skip_all, fields(task_id = %task_id))]
    pub async fn delete(
        &self,
        identity: &dyn SessionIdentity,
        task_id: &TaskId,
    ) -> TaskControlResult<()> {
        let owner = authenticate(identity).await?;
        let task = self.load(task_id, &owner).await?;
        if task.status() == TaskStatus::Processing {
            self.store
                .update_task(
                    task_id,
                    TaskChanges::new().with_status(TaskStatus::Cancelled),
                )
                .await?;
        }
        self.release(&task).await;
        self.store
            .update_task(task_id, TaskChanges::new().clear_sandbox().deleted())
            .await?;
        info!("task deleted");
        Ok(())
    }

    /// Re-attaches to the task's sandbox, reconnecting through the provider
    /// when this process has no registry entry.
    ///
    /// # Errors
    ///
    /// Returns [`TaskControlError::SandboxUnavailable`] when the task has no
    /// binding or the provider cannot find the sandbox.
    #[instrument(skip_all, fields(task_id = %task_id))]
    pub async fn reconnect(
        &self,
        identity: &dyn SessionIdentity,
        task_id: &TaskId,
    ) -> TaskControlResult<SandboxBinding> {
        let owner = authenticate(identity).await?;
        let task = self.load(task_id, &owner).await?;
        let Some(binding) = task.sandbox() else {
            return Err(TaskControlError::SandboxUnavailable(task_id.clone()));
        };
        let handle = self
            .sandboxes
            .resolve(task_id, &binding.sandbox_id)
            .await
            .ok_or_else(|| TaskControlError::SandboxUnavailable(task_id.clone()))?;
        let current = handle.binding();
        if current.sandbox_url.is_empty() {
            return Ok(binding.clone());
        }
        if &current != binding {
            self.store
                .update_task(task_id, TaskChanges::new().with_sandbox(current.clone()))
                .await?;
        }
        Ok(current)
    }

    /// Records a user message on a finished keep-alive task and queues an
    /// agent turn for it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskControlError::EmptyInstruction`],
    /// [`TaskControlError::InvalidState`] unless the task is keep-alive and
    /// `COMPLETED` or `ERROR`, [`TaskControlError::SandboxUnavailable`]
    /// without a binding, and [`TaskControlError::RateLimited`].
    #[instrument(skip_all, fields(task_id = %task_id))]
    pub async fn follow_up(
        &self,
        identity: &dyn SessionIdentity,
        task_id: &TaskId,
        instruction: &str,
    ) -> TaskControlResult<TaskMessage> {
        let owner = authenticate(identity).await?;
        let trimmed = instruction.trim();
        if trimmed.is_empty() {
            return Err(TaskControlError::EmptyInstruction);
        }
        let task = self.load(task_id, &owner).await?;
        if !task.keep_alive()
            || !matches!(task.status(), TaskStatus::Completed | TaskStatus::Error)
        {
            return Err(invalid_state(&task, "follow up on"));
        }
        if task.sandbox().is_none() {
            return Err(TaskControlError::SandboxUnavailable(task_id.clone()));
        }
        self.ensure_quota(&owner).await?;

        let message = TaskMessage::new(task_id.clone(), MessageRole::User, trimmed, &*self.clock);
        self.store.create_message(&message).await?;
        self.dispatcher
            .dispatch(RunRequest::follow_up(task_id.clone(), owner, trimmed))
            .await?;
        Ok(message)
    }

    /// Returns one of the caller's tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskControlError::NotFound`] for unknown, foreign or
    /// deleted tasks.
    pub async fn get(
        &self,
        identity: &dyn SessionIdentity,
        task_id: &TaskId,
    ) -> TaskControlResult<Task> {
        let owner = authenticate(identity).await?;
        self.load(task_id, &owner).await
    }

    /// Lists the caller's live tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskControlError::Unauthenticated`] or a store failure.
    pub async fn list(&self, identity: &dyn SessionIdentity) -> TaskControlResult<Vec<Task>> {
        let owner = authenticate(identity).await?;
        Ok(self.store.list_tasks_for_user(&owner).await?)
    }

    /// Reports the caller's quota without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskControlError::Unauthenticated`] or a counting failure.
    pub async fn quota(&self, identity: &dyn SessionIdentity) -> TaskControlResult<RateLimitStatus> {
        let owner = authenticate(identity).await?;
        Ok(self.limiter.check(&owner).await?)
    }

    async fn persist_and_dispatch(&self, spec: TaskSpec) -> TaskControlResult<Task> {
        let task = Task::create(spec, self.settings.max_duration_limit_minutes, &*self.clock)?;
        self.store.create_task(&task).await?;
        self.log(task.id(), LogLevel::Info, "Task created").await;
        self.dispatcher
            .dispatch(RunRequest::initial(task.id().clone(), task.user_id().clone()))
            .await?;
        info!(task_id = %task.id(), agent = %task.selected_agent(), "task queued");
        Ok(task)
    }

    async fn ensure_quota(&self, owner: &UserId) -> TaskControlResult<()> {
        let status = self.limiter.check(owner).await?;
        if status.allowed {
            return Ok(());
        }
        info!(user_id = %owner, total = status.total, "daily limit reached");
        Err(TaskControlError::RateLimited(status))
    }

    async fn load(&self, task_id: &TaskId, owner: &UserId) -> TaskControlResult<Task> {
        self.store
            .get_task(task_id, owner)
            .await?
            .ok_or_else(|| TaskControlError::NotFound(task_id.clone()))
    }

    async fn release(&self, task: &Task) {
        if self.sandboxes.teardown(task.id()).await {
            return;
        }
        let Some(binding) = task.sandbox() else {
            return;
        };
        if self.sandboxes.resolve(task.id(), &binding.sandbox_id).await.is_some() {
            self.sandboxes.teardown(task.id()).await;
        }
    }

    async fn log(&self, task_id: &TaskId, level: LogLevel, message: &str) {
        let entry = LogEntry::new(level, message, self.clock.utc());
        if let Err(err) = self.store.append_log_entries(task_id, vec![entry]).await {
            warn!(task_id = %task_id, error = %err, "failed to persist task log");
        }
    }
}

async fn authenticate(identity: &dyn SessionIdentity) -> TaskControlResult<UserId> {
    identity
        .current_user_id()
        .await
        .ok_or(TaskControlError::Unauthenticated)
}

fn invalid_state(task: &Task, action: &'static str) -> TaskControlError {
    TaskControlError::InvalidState {
        task_id: task.id().clone(),
        action,
        status: task.status(),
    }
}

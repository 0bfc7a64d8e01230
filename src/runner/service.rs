//! The task run state machine.

use super::{MAX_PROVISION_ATTEMPTS, RunnerError, StoredCancellation, TaskLogger, TaskSettings};
use crate::agent::{
    domain::AgentExecutionResult,
    ports::{AgentInvocation, CancellationCheck},
    services::{AgentCatalog, AgentExecutor, CancellationFlag, ExecutionRequest},
};
use crate::credentials::{domain::ResolvedCredentials, services::CredentialResolver};
use crate::naming::services::{BranchNamer, BranchRequest};
use crate::sandbox::{
    ports::SandboxProvider,
    services::{ProvisionRequest, SandboxHandle, SandboxManager, git},
};
use crate::task::{
    domain::{BranchName, Task, TaskChanges, TaskDomainError, TaskId, TaskStatus, UserId},
    ports::{TaskStore, TaskStoreError},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const COMMIT_SUMMARY_LIMIT: usize = 72;

/// Why a run stopped before completing.
enum Halt {
    Cancelled,
    Failed(String),
}

impl Halt {
    fn failed(context: &str, err: &dyn std::fmt::Display) -> Self {
        Self::Failed(format!("{context}: {err}"))
    }

    fn into_message(self) -> String {
        match self {
            Self::Cancelled => "cancelled".to_owned(),
            Self::Failed(message) => message,
        }
    }
}

/// Drives tasks through provisioning, agent execution and commit/push.
///
/// Every transition and progress update is persisted as a partial update,
/// so a concurrent stop is never overwritten.
pub struct TaskRunner<S, P, C>
where
    S: TaskStore + 'static,
    P: SandboxProvider + 'static,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    sandboxes: Arc<SandboxManager<P>>,
    executor: AgentExecutor<S, C>,
    credentials: CredentialResolver,
    namer: BranchNamer,
    clock: Arc<C>,
    settings: TaskSettings,
}

impl<S, P, C> TaskRunner<S, P, C>
where
    S: TaskStore + 'static,
    P: SandboxProvider + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a runner.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        sandboxes: Arc<SandboxManager<P>>,
        catalog: Arc<AgentCatalog>,
        credentials: CredentialResolver,
        namer: BranchNamer,
        clock: Arc<C>,
        settings: TaskSettings,
    ) -> Self {
        let executor = AgentExecutor::new(catalog, Arc::clone(&store), Arc::clone(&clock));
        Self {
            store,
            sandboxes,
            executor,
            credentials,
            namer,
            clock,
            settings,
        }
    }

    /// Returns the sandbox manager.
    #[must_use]
    pub const fn sandboxes(&self) -> &Arc<SandboxManager<P>> {
        &self.sandboxes
    }

    /// Runs a pending task to a terminal state, watching the store for a
    /// user stop.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::TaskNotFound`] or [`RunnerError::NotPending`]
    /// when the task cannot start, and [`RunnerError::Store`] when the
    /// final transition cannot be persisted.
    pub async fn run(&self, task_id: &TaskId, owner: &UserId) -> Result<TaskStatus, RunnerError> {
        let cancellation =
            StoredCancellation::new(Arc::clone(&self.store), task_id.clone(), owner.clone());
        self.run_with_cancellation(task_id, owner, &cancellation)
            .await
    }

    /// Runs a pending task with an explicit cancellation check.
    ///
    /// Returns the terminal status. Step failures end in `ERROR` and are
    /// not reported as errors.
    ///
    /// # Errors
    ///
    /// See [`TaskRunner::run`].
    #[instrument(skip_all, fields(task_id = %task_id))]
    pub async fn run_with_cancellation(
        &self,
        task_id: &TaskId,
        owner: &UserId,
        cancellation: &dyn CancellationCheck,
    ) -> Result<TaskStatus, RunnerError> {
        let task = self.load(task_id, owner).await?;
        if task.status() != TaskStatus::Pending {
            return Err(RunnerError::NotPending {
                task_id: task_id.clone(),
                status: task.status(),
            });
        }
        self.store
            .update_task(
                task_id,
                TaskChanges::new()
                    .with_status(TaskStatus::Processing)
                    .with_progress(5),
            )
            .await?;
        let mut logger = self.logger(task_id);
        logger
            .info(format!("Task started with {}", task.selected_agent()))
            .await;

        let halt = self.drive(&task, &mut logger, cancellation).await.err();
        let outcome = match halt {
            None => self.complete(task_id, &logger).await,
            Some(Halt::Cancelled) => self.cancel(task_id, &logger).await,
            Some(Halt::Failed(message)) => self.fail(task_id, &logger, &message).await,
        };

        let keep = task.keep_alive()
            && matches!(outcome, Ok(TaskStatus::Completed | TaskStatus::Error));
        if keep {
            debug!("keeping sandbox alive");
        } else {
            self.release(task_id, owner).await;
        }
        let status = outcome?;
        info!(status = %status, "task run finished");
        Ok(status)
    }

    /// Runs one more agent turn in the live sandbox of a finished
    /// keep-alive task.
    ///
    /// The task status does not change. The agent session is resumed when
    /// the backend reported one, and any changes are committed and pushed.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::FollowUpUnavailable`] unless the task is a
    /// keep-alive task in `COMPLETED` or `ERROR`,
    /// [`RunnerError::SandboxUnavailable`] when its sandbox cannot be
    /// reached, [`RunnerError::Credentials`] when the agent has no usable
    /// credential, and [`RunnerError::FollowUpFailed`] when the agent turn
    /// or the push fails.
    #[instrument(skip_all, fields(task_id = %task_id))]
    pub async fn follow_up(
        &self,
        task_id: &TaskId,
        owner: &UserId,
        instruction: &str,
    ) -> Result<AgentExecutionResult, RunnerError> {
        let task = self.load(task_id, owner).await?;
        if !task.keep_alive()
            || !matches!(task.status(), TaskStatus::Completed | TaskStatus::Error)
        {
            return Err(RunnerError::FollowUpUnavailable {
                task_id: task_id.clone(),
                status: task.status(),
            });
        }
        let (Some(binding), Some(branch)) = (task.sandbox(), task.branch_name()) else {
            return Err(RunnerError::SandboxUnavailable(task_id.clone()));
        };
        let handle = self
            .sandboxes
            .resolve(task_id, &binding.sandbox_id)
            .await
            .ok_or_else(|| RunnerError::SandboxUnavailable(task_id.clone()))?;

        let credentials = self.credentials.resolve(owner).await?;
        let mut logger = self.logger(task_id);
        logger.add_secrets(credentials.secret_values());
        credentials.ensure_agent_ready(task.selected_agent())?;
        logger.info("Follow-up received").await;

        let never = CancellationFlag::new();
        let turn = AgentTurn {
            task: &task,
            handle: &handle,
            credentials: &credentials,
            instruction,
            resume: task.agent_session_id().map(str::to_owned),
        };
        let result = match self.agent_turn(turn, &never, &logger).await {
            Ok(result) => result,
            Err(halt) => {
                let message = logger.redact(&halt.into_message());
                logger.error(&message).await;
                return Err(RunnerError::FollowUpFailed(message));
            }
        };
        if !result.success {
            let message = logger.redact(result.error.as_deref().unwrap_or(&result.output));
            logger.error(format!("Follow-up failed: {message}")).await;
            return Ok(result);
        }
        if result.changes_detected
            && let Err(halt) = self
                .commit_and_push(&handle, branch, instruction, &logger)
                .await
        {
            let message = logger.redact(&halt.into_message());
            logger.error(&message).await;
            return Err(RunnerError::FollowUpFailed(message));
        }
        logger.success("Follow-up completed").await;
        Ok(result)
    }

    async fn drive(
        &self,
        task: &Task,
        logger: &mut TaskLogger<S, C>,
        cancellation: &dyn CancellationCheck,
    ) -> Result<(), Halt> {
        checkpoint(cancellation, "before provisioning").await?;
        let credentials = self.resolve_credentials(task, logger).await?;
        let branch = self.assign_branch(task, logger).await?;
        let handle = self.provision(task, &branch, &credentials, logger).await?;
        if task.install_dependencies() {
            self.install(task.id(), &handle, logger).await?;
        }

        checkpoint(cancellation, "before agent execution").await?;
        let turn = AgentTurn {
            task,
            handle: &handle,
            credentials: &credentials,
            instruction: task.prompt(),
            resume: task.agent_session_id().map(str::to_owned),
        };
        let result = self.agent_turn(turn, cancellation, logger).await?;
        if !result.success {
            return Err(Halt::Failed(result.error.unwrap_or(result.output)));
        }
        logger.success(format!("{} finished", task.selected_agent())).await;
        self.update(task.id(), TaskChanges::new().with_progress(80))
            .await?;

        checkpoint(cancellation, "before commit").await?;
        if result.changes_detected {
            self.commit_and_push(&handle, &branch, task.prompt(), logger)
                .await?;
            self.update(task.id(), TaskChanges::new().with_progress(95))
                .await?;
        } else {
            logger.info("No changes to commit").await;
        }
        Ok(())
    }

    async fn resolve_credentials(
        &self,
        task: &Task,
        logger: &mut TaskLogger<S, C>,
    ) -> Result<ResolvedCredentials, Halt> {
        let credentials = self
            .credentials
            .resolve(task.user_id())
            .await
            .map_err(|err| Halt::failed("Credential resolution failed", &err))?;
        logger.add_secrets(credentials.secret_values());
        credentials
            .ensure_agent_ready(task.selected_agent())
            .map_err(|err| Halt::Failed(err.to_string()))?;
        Ok(credentials)
    }

    async fn assign_branch(
        &self,
        task: &Task,
        logger: &TaskLogger<S, C>,
    ) -> Result<BranchName, Halt> {
        let branch = if let Some(existing) = task.branch_name() {
            logger.info(format!("Using branch {existing}")).await;
            existing.clone()
        } else {
            let request =
                BranchRequest::new(task.prompt()).with_repo_hint(task.repository().as_str());
            let generated = self
                .namer
                .name_or_fallback(request, task.id(), self.clock.utc())
                .await;
            logger.info(format!("Created branch {generated}")).await;
            generated
        };
        self.update(
            task.id(),
            TaskChanges::new()
                .with_branch_name(branch.clone())
                .with_progress(15),
        )
        .await?;
        Ok(branch)
    }

    async fn provision(
        &self,
        task: &Task,
        branch: &BranchName,
        credentials: &ResolvedCredentials,
        logger: &TaskLogger<S, C>,
    ) -> Result<SandboxHandle, Halt> {
        let request = ProvisionRequest {
            task_id: task.id(),
            repo_url: task.repo_url(),
            branch,
            credentials,
            timeout_minutes: task
                .max_duration_minutes()
                .max(self.sandboxes.settings().timeout_minutes),
        };
        let attempts = self
            .settings
            .provision_attempts
            .clamp(1, MAX_PROVISION_ATTEMPTS);
        let mut attempt = 1;
        logger.info("Creating sandbox").await;
        let handle = loop {
            match self.sandboxes.provision(request).await {
                Ok(handle) => break handle,
                Err(err) if err.is_configuration() || attempt >= attempts => {
                    return Err(Halt::Failed(err.to_string()));
                }
                Err(err) => {
                    warn!(task_id = %task.id(), attempt, error = %err, "provisioning failed; retrying");
                    logger
                        .info(format!("Sandbox creation failed, retrying ({attempt}/{attempts})"))
                        .await;
                    attempt += 1;
                }
            }
        };

        self.sandboxes.register(handle.clone()).await;
        self.update(
            task.id(),
            TaskChanges::new()
                .with_sandbox(handle.binding())
                .with_progress(30),
        )
        .await?;
        logger
            .success(format!("Sandbox {} ready", handle.sandbox_id()))
            .await;
        Ok(handle)
    }

    async fn install(
        &self,
        task_id: &TaskId,
        handle: &SandboxHandle,
        logger: &TaskLogger<S, C>,
    ) -> Result<(), Halt> {
        logger.command("Installing dependencies").await;
        match self.sandboxes.install_dependencies(handle).await {
            Ok(Some(manager)) => {
                logger
                    .success(format!("Installed dependencies with {manager}"))
                    .await;
            }
            Ok(None) => logger.info("No dependency manifest found").await,
            Err(err) => return Err(Halt::failed("Dependency installation failed", &err)),
        }
        self.update(task_id, TaskChanges::new().with_progress(45))
            .await?;
        Ok(())
    }

    async fn agent_turn(
        &self,
        turn: AgentTurn<'_>,
        cancellation: &dyn CancellationCheck,
        logger: &TaskLogger<S, C>,
    ) -> Result<AgentExecutionResult, Halt> {
        let task = turn.task;
        let agent = task.selected_agent();
        let invocation = AgentInvocation::new(turn.instruction)
            .with_model(task.selected_model().map(str::to_owned))
            .with_connectors(self.settings.connectors.clone())
            .with_resume_session(turn.resume);
        let request = ExecutionRequest {
            handle: turn.handle,
            agent,
            invocation,
            credentials: turn.credentials,
        };
        logger.command(format!("Running {agent}")).await;

        let minutes = task.max_duration_minutes();
        let limit = Duration::from_secs(u64::from(minutes).saturating_mul(60));
        let Ok(result) = tokio::time::timeout(limit, self.executor.execute(request, cancellation)).await
        else {
            return Err(Halt::Failed(format!(
                "{agent} exceeded the maximum duration of {minutes} minutes"
            )));
        };
        if result.cancelled {
            return Err(Halt::Cancelled);
        }
        if let Some(session) = &result.session_id {
            self.update(task.id(), TaskChanges::new().with_agent_session(session.clone()))
                .await?;
        }
        Ok(result)
    }

    async fn commit_and_push(
        &self,
        handle: &SandboxHandle,
        branch: &BranchName,
        instruction: &str,
        logger: &TaskLogger<S, C>,
    ) -> Result<(), Halt> {
        logger.command("Committing changes").await;
        git::commit_all(handle, &commit_message(instruction))
            .await
            .map_err(|err| Halt::failed("Commit failed", &err))?;
        logger.command(format!("Pushing {branch}")).await;
        git::push(handle, branch)
            .await
            .map_err(|err| Halt::failed("Push failed", &err))?;
        logger.success(format!("Pushed changes to {branch}")).await;
        Ok(())
    }

    async fn complete(
        &self,
        task_id: &TaskId,
        logger: &TaskLogger<S, C>,
    ) -> Result<TaskStatus, TaskStoreError> {
        let changes = TaskChanges::new()
            .with_status(TaskStatus::Completed)
            .with_progress(100);
        let status = self.terminate(task_id, changes, TaskStatus::Completed).await?;
        if status == TaskStatus::Completed {
            logger.success("Task completed").await;
        } else {
            logger.info("Task cancelled").await;
        }
        Ok(status)
    }

    async fn fail(
        &self,
        task_id: &TaskId,
        logger: &TaskLogger<S, C>,
        message: &str,
    ) -> Result<TaskStatus, TaskStoreError> {
        let redacted = logger.redact(message);
        let changes = TaskChanges::new()
            .with_status(TaskStatus::Error)
            .with_error(redacted.clone());
        let status = self.terminate(task_id, changes, TaskStatus::Error).await?;
        if status == TaskStatus::Error {
            logger.error(&redacted).await;
        }
        Ok(status)
    }

    async fn cancel(
        &self,
        task_id: &TaskId,
        logger: &TaskLogger<S, C>,
    ) -> Result<TaskStatus, TaskStoreError> {
        let changes = TaskChanges::new().with_status(TaskStatus::Cancelled);
        self.terminate(task_id, changes, TaskStatus::Cancelled).await?;
        logger.info("Task cancelled").await;
        Ok(TaskStatus::Cancelled)
    }

    /// Applies a terminal transition. A refusal because the task is
    /// already cancelled reports `CANCELLED`.
    async fn terminate(
        &self,
        task_id: &TaskId,
        changes: TaskChanges,
        target: TaskStatus,
    ) -> Result<TaskStatus, TaskStoreError> {
        match self.store.update_task(task_id, changes).await {
            Ok(_) => Ok(target),
            Err(TaskStoreError::Domain(TaskDomainError::InvalidStateTransition {
                from: TaskStatus::Cancelled,
                ..
            })) => {
                debug!(task_id = %task_id, "task already cancelled");
                Ok(TaskStatus::Cancelled)
            }
            Err(err) => Err(err),
        }
    }

    /// Tears down the registered sandbox and clears any binding still
    /// stored, including one a user stop raced past.
    async fn release(&self, task_id: &TaskId, owner: &UserId) {
        let registered = self.sandboxes.teardown(task_id).await;
        let bound = match self.store.get_task(task_id, owner).await {
            Ok(stored) => stored.is_some_and(|task| task.sandbox().is_some()),
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "failed to reload task for release");
                registered
            }
        };
        if !bound {
            return;
        }
        if let Err(err) = self
            .store
            .update_task(task_id, TaskChanges::new().clear_sandbox())
            .await
        {
            warn!(task_id = %task_id, error = %err, "failed to clear sandbox binding");
        }
    }

    async fn update(&self, task_id: &TaskId, changes: TaskChanges) -> Result<Task, Halt> {
        self.store
            .update_task(task_id, changes)
            .await
            .map_err(|err| Halt::failed("Failed to persist task", &err))
    }

    async fn load(&self, task_id: &TaskId, owner: &UserId) -> Result<Task, RunnerError> {
        self.store
            .get_task(task_id, owner)
            .await?
            .ok_or_else(|| RunnerError::TaskNotFound(task_id.clone()))
    }

    fn logger(&self, task_id: &TaskId) -> TaskLogger<S, C> {
        TaskLogger::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            task_id.clone(),
        )
    }
}

struct AgentTurn<'a> {
    task: &'a Task,
    handle: &'a SandboxHandle,
    credentials: &'a ResolvedCredentials,
    instruction: &'a str,
    resume: Option<String>,
}

async fn checkpoint(cancellation: &dyn CancellationCheck, stage: &'static str) -> Result<(), Halt> {
    if cancellation.is_cancelled().await {
        debug!(stage, "cancellation observed");
        return Err(Halt::Cancelled);
    }
    Ok(())
}

fn commit_message(instruction: &str) -> String {
    let summary: String = instruction
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .chars()
        .take(COMMIT_SUMMARY_LIMIT)
        .collect();
    if summary.is_empty() {
        "Apply agent changes".to_owned()
    } else {
        summary
    }
}

//! Runs one agent turn inside a task sandbox.

use crate::agent::{
    domain::{AgentExecutionResult, AgentKind},
    ports::{AgentBackendError, AgentInvocation, BackendOutput, CancellationCheck},
    services::AgentCatalog,
};
use crate::credentials::domain::ResolvedCredentials;
use crate::sandbox::services::{SandboxHandle, git};
use crate::task::{
    domain::{MessageId, MessageRole, TaskId, TaskMessage},
    ports::TaskStore,
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Inputs for one agent execution.
#[derive(Debug)]
pub struct ExecutionRequest<'a> {
    /// Sandbox the agent runs in.
    pub handle: &'a SandboxHandle,
    /// Backend to run.
    pub agent: AgentKind,
    /// Instruction, model, connectors and session to resume.
    pub invocation: AgentInvocation,
    /// Credentials resolved for the task.
    pub credentials: &'a ResolvedCredentials,
}

/// Executes agent backends and records their responses as task messages.
///
/// Execution never fails with an error: every outcome, including an
/// unknown backend, is an [`AgentExecutionResult`].
pub struct AgentExecutor<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    catalog: Arc<AgentCatalog>,
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> AgentExecutor<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates an executor.
    #[must_use]
    pub const fn new(catalog: Arc<AgentCatalog>, store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            catalog,
            store,
            clock,
        }
    }

    /// Returns the backend catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<AgentCatalog> {
        &self.catalog
    }

    /// Runs the requested agent.
    ///
    /// Cancellation is checked before any remote work. Only the agent's own
    /// credentials are injected into the handle, and the previous
    /// environment is restored when the backend returns or the future is
    /// dropped. `changes_detected` comes from `git status` regardless of how
    /// the agent exited.
    #[instrument(
        skip_all,
        fields(task_id = %request.handle.task_id(), agent = %request.agent)
    )]
    pub async fn execute(
        &self,
        request: ExecutionRequest<'_>,
        cancellation: &dyn CancellationCheck,
    ) -> AgentExecutionResult {
        let agent = request.agent;
        if cancellation.is_cancelled().await {
            info!("agent execution skipped: task cancelled");
            return AgentExecutionResult::cancelled(agent);
        }
        let Some(backend) = self
            .catalog
            .get(agent)
            .filter(|backend| backend.is_available())
        else {
            warn!("agent backend not available");
            return AgentExecutionResult::not_yet_available(agent);
        };

        let task_id = request.handle.task_id();
        let message_id = self.open_agent_message(task_id).await;

        let outcome = {
            let scope = request
                .handle
                .scope_credentials(request.credentials.env_for(agent))
                .await;
            backend.run(&scope, &request.invocation).await
        };

        let result = match outcome {
            Ok(output) => {
                let changes_detected = detect_changes(request.handle).await;
                completed(agent, output, changes_detected)
            }
            Err(AgentBackendError::NotAvailable(kind)) => {
                AgentExecutionResult::not_yet_available(kind)
            }
            Err(err) => {
                warn!(error = %err, "agent backend failed");
                AgentExecutionResult::failure(agent, err.to_string())
            }
        };

        if let Some(id) = message_id {
            self.close_agent_message(id, &result).await;
        }
        info!(
            success = result.success,
            changes_detected = result.changes_detected,
            "agent execution finished"
        );
        result
    }

    async fn open_agent_message(&self, task_id: &TaskId) -> Option<MessageId> {
        let message = TaskMessage::new(task_id.clone(), MessageRole::Agent, "", &*self.clock);
        match self.store.create_message(&message).await {
            Ok(()) => Some(message.id()),
            Err(err) => {
                warn!(error = %err, "failed to create agent message");
                None
            }
        }
    }

    async fn close_agent_message(&self, id: MessageId, result: &AgentExecutionResult) {
        let content = if result.agent_response.is_empty() {
            result.output.as_str()
        } else {
            result.agent_response.as_str()
        };
        if let Err(err) = self.store.update_message_content(id, content).await {
            warn!(error = %err, "failed to update agent message");
        }
    }
}

async fn detect_changes(handle: &SandboxHandle) -> bool {
    git::has_changes(handle).await.unwrap_or_else(|err| {
        warn!(task_id = %handle.task_id(), error = %err, "could not inspect working tree");
        false
    })
}

fn completed(agent: AgentKind, output: BackendOutput, changes_detected: bool) -> AgentExecutionResult {
    let summary = match (&output.error, output.response.is_empty()) {
        (Some(error), _) => error.clone(),
        (None, true) => format!("{agent} finished without a response"),
        (None, false) => output.response.clone(),
    };
    AgentExecutionResult {
        success: output.success,
        output: summary,
        agent_response: output.response,
        backend: agent,
        changes_detected,
        error: output.error,
        session_id: output.session_id,
        cancelled: false,
    }
}

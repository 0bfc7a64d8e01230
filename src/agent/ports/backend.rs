//! Backend port implemented once per coding-agent CLI.

use crate::agent::domain::{AgentKind, Connector};
use crate::sandbox::{ports::SandboxProviderError, services::CredentialScope};
use async_trait::async_trait;
use thiserror::Error;

/// One agent run as seen by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInvocation {
    /// Natural-language instruction.
    pub instruction: String,
    /// Model override, when the task selected one.
    pub model: Option<String>,
    /// Tool servers offered to the agent.
    pub connectors: Vec<Connector>,
    /// Session to resume for follow-up runs.
    pub resume_session: Option<String>,
}

impl AgentInvocation {
    /// Creates an invocation with only an instruction.
    #[must_use]
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            model: None,
            connectors: Vec::new(),
            resume_session: None,
        }
    }

    /// Sets the model override.
    #[must_use]
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Sets the connectors.
    #[must_use]
    pub fn with_connectors(mut self, connectors: Vec<Connector>) -> Self {
        self.connectors = connectors;
        self
    }

    /// Sets the session to resume.
    #[must_use]
    pub fn with_resume_session(mut self, session: Option<String>) -> Self {
        self.resume_session = session;
        self
    }
}

/// What a backend extracted from the agent process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOutput {
    /// Whether the CLI exited cleanly and reported no error.
    pub success: bool,
    /// Final response text.
    pub response: String,
    /// Resumable session identifier, when the CLI reports one.
    pub session_id: Option<String>,
    /// Error text for failed runs.
    pub error: Option<String>,
}

/// Errors that prevent a backend from producing output at all.
#[derive(Debug, Clone, Error)]
pub enum AgentBackendError {
    /// The backend is declared but cannot run yet.
    #[error("{0} is not yet available")]
    NotAvailable(AgentKind),

    /// The CLI was missing and could not be installed.
    #[error("failed to install {binary}: {stderr}")]
    InstallFailed {
        /// CLI binary name.
        binary: String,
        /// Installer error output.
        stderr: String,
    },

    /// Connector configuration could not be written.
    #[error("failed to configure connectors: {0}")]
    ConnectorSetup(String),

    /// The sandbox rejected a command.
    #[error(transparent)]
    Sandbox(#[from] SandboxProviderError),
}

/// A coding-agent backend.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Returns the backend this implementation serves.
    fn kind(&self) -> AgentKind;

    /// Returns `false` for backends that are declared but not implemented.
    fn is_available(&self) -> bool {
        true
    }

    /// Runs the agent with the scope's credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AgentBackendError`] when the CLI cannot be installed,
    /// configured or started. A CLI that runs and fails is reported through
    /// [`BackendOutput::success`].
    async fn run(
        &self,
        scope: &CredentialScope<'_>,
        invocation: &AgentInvocation,
    ) -> Result<BackendOutput, AgentBackendError>;
}

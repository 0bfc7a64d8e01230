//! Remote sandbox provider port.

use crate::sandbox::domain::{CommandOutput, CommandRequest, RemoteSandbox, SandboxSpec};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for sandbox provider operations.
pub type SandboxProviderResult<T> = Result<T, SandboxProviderError>;

/// Contract for a remote compute provider.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Creates a sandbox with the repository cloned and returns its identity.
    async fn create(&self, spec: &SandboxSpec) -> SandboxProviderResult<RemoteSandbox>;

    /// Reconnects to an existing sandbox.
    async fn get(&self, sandbox_id: &str) -> SandboxProviderResult<RemoteSandbox>;

    /// Runs a command and captures its output.
    async fn run_command(
        &self,
        sandbox: &RemoteSandbox,
        request: &CommandRequest,
    ) -> SandboxProviderResult<CommandOutput>;

    /// Stops the sandbox.
    async fn stop(&self, sandbox: &RemoteSandbox) -> SandboxProviderResult<()>;

    /// Returns the public URL routed to `port`.
    async fn domain(&self, sandbox: &RemoteSandbox, port: u16) -> SandboxProviderResult<String>;
}

/// Errors returned by sandbox providers.
#[derive(Debug, Clone, Error)]
pub enum SandboxProviderError {
    /// The call did not complete in time.
    #[error("sandbox provider timed out: {0}")]
    Timeout(String),

    /// The provider rejected the credentials.
    #[error("sandbox provider rejected credentials: {0}")]
    Unauthorized(String),

    /// The account quota is exhausted.
    #[error("sandbox quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The sandbox does not exist or has stopped.
    #[error("sandbox not found: {0}")]
    NotFound(String),

    /// Transport-level failure.
    #[error("sandbox provider transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl SandboxProviderError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}

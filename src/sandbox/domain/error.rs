//! Sandbox lifecycle errors.

use crate::sandbox::ports::SandboxProviderError;
use thiserror::Error;

/// Errors surfaced by the sandbox lifecycle manager.
#[derive(Debug, Clone, Error)]
pub enum SandboxError {
    /// Provider credentials or identifiers are missing.
    #[error("sandbox configuration error: {0}")]
    Configuration(String),

    /// The sandbox could not be created or prepared.
    #[error("sandbox provisioning failed: {0}")]
    ProvisionFailed(String),

    /// A command exited with a non-zero status.
    #[error("command `{command}` failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code.
        exit_code: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// The provider call itself failed.
    #[error(transparent)]
    Provider(#[from] SandboxProviderError),
}

impl SandboxError {
    /// Returns `true` for errors that retrying cannot fix.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

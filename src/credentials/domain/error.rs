//! Credential resolution errors.

use crate::agent::domain::AgentKind;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while resolving or validating credentials.
///
/// Every variant except [`CredentialError::Store`] is a configuration
/// error and is never retried.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// The selected agent has no API key.
    #[error("{agent} requires an API key: set {variables}")]
    MissingApiKey {
        /// Agent that cannot run.
        agent: AgentKind,
        /// Environment variables that would satisfy the agent.
        variables: String,
    },

    /// No git-hosting token is available.
    #[error("a git hosting token is required")]
    MissingGitHostingToken,

    /// A sandbox provider credential is missing.
    #[error("sandbox provider {0} is not configured")]
    MissingSandboxCredential(&'static str),

    /// The credential store failed.
    #[error("credential store error: {0}")]
    Store(Arc<dyn std::error::Error + Send + Sync>),
}

impl CredentialError {
    /// Wraps a credential store failure.
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Arc::new(err))
    }
}

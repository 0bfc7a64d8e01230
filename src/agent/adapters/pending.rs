//! Backends that are declared but cannot run yet.

use async_trait::async_trait;

use crate::agent::{
    domain::AgentKind,
    ports::{AgentBackend, AgentBackendError, AgentInvocation, BackendOutput},
};
use crate::sandbox::services::CredentialScope;

/// Placeholder for a backend with no CLI integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingBackend {
    kind: AgentKind,
}

impl PendingBackend {
    /// Declares `kind` as not yet available.
    #[must_use]
    pub const fn new(kind: AgentKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl AgentBackend for PendingBackend {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn run(
        &self,
        _scope: &CredentialScope<'_>,
        _invocation: &AgentInvocation,
    ) -> Result<BackendOutput, AgentBackendError> {
        Err(AgentBackendError::NotAvailable(self.kind))
    }
}

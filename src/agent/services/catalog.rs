//! Lookup of agent backends by kind.

use crate::agent::{
    adapters::{
        cli::{
            ClaudeProfile, CliAgentBackend, CodexProfile, CopilotProfile, CursorProfile,
            GeminiProfile, OpenCodeProfile,
        },
        pending::PendingBackend,
    },
    domain::AgentKind,
    ports::AgentBackend,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Backends available to the executor, keyed by [`AgentKind`].
#[derive(Clone, Default)]
pub struct AgentCatalog {
    backends: HashMap<AgentKind, Arc<dyn AgentBackend>>,
}

impl AgentCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog with a backend for every [`AgentKind`].
    ///
    /// Amp and Droid are declared but report themselves unavailable.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .with_backend(Arc::new(CliAgentBackend::new(ClaudeProfile)))
            .with_backend(Arc::new(CliAgentBackend::new(CodexProfile)))
            .with_backend(Arc::new(CliAgentBackend::new(CopilotProfile)))
            .with_backend(Arc::new(CliAgentBackend::new(CursorProfile)))
            .with_backend(Arc::new(CliAgentBackend::new(GeminiProfile)))
            .with_backend(Arc::new(CliAgentBackend::new(OpenCodeProfile)))
            .with_backend(Arc::new(PendingBackend::new(AgentKind::Amp)))
            .with_backend(Arc::new(PendingBackend::new(AgentKind::Droid)))
    }

    /// Adds or replaces the backend for its kind.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn AgentBackend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    /// Returns the backend for `kind`.
    #[must_use]
    pub fn get(&self, kind: AgentKind) -> Option<Arc<dyn AgentBackend>> {
        self.backends.get(&kind).cloned()
    }

    /// Returns the kinds whose backends can run, in display order.
    #[must_use]
    pub fn available(&self) -> Vec<AgentKind> {
        AgentKind::ALL
            .into_iter()
            .filter(|kind| {
                self.backends
                    .get(kind)
                    .is_some_and(|backend| backend.is_available())
            })
            .collect()
    }
}

impl fmt::Debug for AgentCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<AgentKind> = self.backends.keys().copied().collect();
        kinds.sort();
        f.debug_struct("AgentCatalog").field("backends", &kinds).finish()
    }
}

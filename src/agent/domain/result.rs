//! Outcome of one agent execution.

use super::AgentKind;
use serde::{Deserialize, Serialize};

/// Value returned by the agent executor for every run.
///
/// Failures are reported through `success` and `error` rather than a
/// `Result`, so the runner handles every backend the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    /// Whether the agent completed without error.
    pub success: bool,
    /// Human-readable summary of the run.
    pub output: String,
    /// Raw response text extracted from the agent output.
    pub agent_response: String,
    /// Backend that handled the run.
    pub backend: AgentKind,
    /// Whether the working tree changed during the run.
    pub changes_detected: bool,
    /// Error text for failed runs.
    pub error: Option<String>,
    /// Resumable session identifier reported by the backend.
    pub session_id: Option<String>,
    /// Whether the run was skipped because the task was cancelled.
    pub cancelled: bool,
}

impl AgentExecutionResult {
    /// Result for a run skipped because cancellation was observed.
    #[must_use]
    pub fn cancelled(backend: AgentKind) -> Self {
        Self {
            success: false,
            output: "Execution cancelled".to_owned(),
            agent_response: String::new(),
            backend,
            changes_detected: false,
            error: None,
            session_id: None,
            cancelled: true,
        }
    }

    /// Result for a run that failed before or during execution.
    #[must_use]
    pub fn failure(backend: AgentKind, error: impl Into<String>) -> Self {
        let message = error.into();
        Self {
            success: false,
            output: message.clone(),
            agent_response: String::new(),
            backend,
            changes_detected: false,
            error: Some(message),
            session_id: None,
            cancelled: false,
        }
    }

    /// Result for a run the backend reports as not yet available.
    #[must_use]
    pub fn not_yet_available(backend: AgentKind) -> Self {
        Self::failure(backend, format!("{backend} is not yet available"))
    }
}

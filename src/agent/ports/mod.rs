//! Port contracts for agent execution.
//!
//! Backends run inside a credential scope of a sandbox handle and never see
//! the task store; cancellation is checked through [`CancellationCheck`].

pub mod backend;
pub mod cancellation;

pub use backend::{AgentBackend, AgentBackendError, AgentInvocation, BackendOutput};
pub use cancellation::CancellationCheck;

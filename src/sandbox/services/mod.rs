//! Sandbox lifecycle services.

pub mod git;
mod handle;
mod manager;
mod registry;

pub use handle::{CredentialScope, SandboxHandle};
pub use manager::{ProvisionRequest, SandboxManager, SandboxSettings};
pub use registry::SandboxRegistry;

//! Port contracts for remote sandbox providers.

mod provider;

pub use provider::{SandboxProvider, SandboxProviderError, SandboxProviderResult};

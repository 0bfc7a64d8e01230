//! Credential value objects.

mod error;
mod provider;
mod resolved;
mod secret;

pub use error::CredentialError;
pub use provider::ApiProvider;
pub use resolved::{ResolvedCredentials, SandboxCredentials};
pub use secret::Secret;

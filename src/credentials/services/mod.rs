//! Credential resolution services.

mod resolver;

pub use resolver::{CredentialDefaults, CredentialResolver};

//! Port contracts for per-user credential storage.

mod store;

pub use store::{CredentialStore, CredentialStoreError, CredentialStoreResult};

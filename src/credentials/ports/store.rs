//! Per-user credential store port.

use crate::credentials::domain::{ApiProvider, Secret};
use crate::task::domain::UserId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for credential store operations.
pub type CredentialStoreResult<T> = Result<T, CredentialStoreError>;

/// Encrypted-at-rest credential storage, decrypted on read.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the user's API key for `provider`, if stored.
    async fn get_api_key(
        &self,
        user_id: &UserId,
        provider: ApiProvider,
    ) -> CredentialStoreResult<Option<Secret>>;

    /// Returns the user's git-hosting token, if stored.
    async fn get_git_hosting_token(&self, user_id: &UserId)
    -> CredentialStoreResult<Option<Secret>>;
}

/// Errors returned by credential store implementations.
#[derive(Debug, Clone, Error)]
pub enum CredentialStoreError {
    /// A stored value could not be decrypted.
    #[error("failed to decrypt {0} credential")]
    Decryption(String),

    /// Storage-layer failure.
    #[error("credential persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CredentialStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

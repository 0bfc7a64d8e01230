//! In-memory credential store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::credentials::{
    domain::{ApiProvider, Secret},
    ports::{CredentialStore, CredentialStoreError, CredentialStoreResult},
};
use crate::task::domain::UserId;

/// Thread-safe in-memory credential store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    state: Arc<RwLock<CredentialState>>,
}

#[derive(Debug, Default)]
struct CredentialState {
    api_keys: HashMap<(UserId, ApiProvider), Secret>,
    git_tokens: HashMap<UserId, Secret>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an API key for a user.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::Persistence`] when the lock is
    /// poisoned.
    pub fn put_api_key(
        &self,
        user_id: UserId,
        provider: ApiProvider,
        key: Secret,
    ) -> CredentialStoreResult<()> {
        let mut state = self.state.write().map_err(|err| {
            CredentialStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        state.api_keys.insert((user_id, provider), key);
        Ok(())
    }

    /// Stores a git-hosting token for a user.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::Persistence`] when the lock is
    /// poisoned.
    pub fn put_git_hosting_token(&self, user_id: UserId, token: Secret) -> CredentialStoreResult<()> {
        let mut state = self.state.write().map_err(|err| {
            CredentialStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        state.git_tokens.insert(user_id, token);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_api_key(
        &self,
        user_id: &UserId,
        provider: ApiProvider,
    ) -> CredentialStoreResult<Option<Secret>> {
        let state = self.state.read().map_err(|err| {
            CredentialStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.api_keys.get(&(user_id.clone(), provider)).cloned())
    }

    async fn get_git_hosting_token(
        &self,
        user_id: &UserId,
    ) -> CredentialStoreResult<Option<Secret>> {
        let state = self.state.read().map_err(|err| {
            CredentialStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.git_tokens.get(user_id).cloned())
    }
}

//! Per-task credential resolution with process-wide fallbacks.

use crate::credentials::{
    domain::{ApiProvider, CredentialError, ResolvedCredentials, SandboxCredentials, Secret},
    ports::CredentialStore,
};
use crate::task::domain::UserId;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Process-wide credentials used when a user has none stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CredentialDefaults {
    /// Default API keys per provider.
    pub api_keys: BTreeMap<ApiProvider, Secret>,
    /// Default git-hosting token.
    pub git_hosting_token: Option<Secret>,
    /// Sandbox provider credentials.
    pub sandbox: SandboxCredentials,
}

/// Resolves the credentials a task runs with.
///
/// Each value comes from the user's stored credentials when present and
/// falls back to [`CredentialDefaults`] otherwise.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    defaults: Arc<CredentialDefaults>,
}

impl CredentialResolver {
    /// Creates a resolver.
    #[must_use]
    pub const fn new(store: Arc<dyn CredentialStore>, defaults: Arc<CredentialDefaults>) -> Self {
        Self { store, defaults }
    }

    /// Resolves every credential for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Store`] when the credential store fails.
    pub async fn resolve(&self, user_id: &UserId) -> Result<ResolvedCredentials, CredentialError> {
        let mut resolved = ResolvedCredentials::new(self.defaults.sandbox.clone());
        for provider in ApiProvider::ALL {
            let stored = self
                .store
                .get_api_key(user_id, provider)
                .await
                .map_err(CredentialError::store)?;
            let source = if stored.is_some() { "user" } else { "default" };
            if let Some(key) = stored.or_else(|| self.defaults.api_keys.get(&provider).cloned()) {
                debug!(user_id = %user_id, provider = %provider, source, "resolved API key");
                resolved = resolved.with_api_key(provider, key);
            }
        }
        if let Some(token) = self.git_hosting_token(user_id).await? {
            resolved = resolved.with_git_hosting_token(token);
        }
        Ok(resolved)
    }

    /// Resolves only the git-hosting token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Store`] when the credential store fails.
    pub async fn git_hosting_token(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Secret>, CredentialError> {
        let stored = self
            .store
            .get_git_hosting_token(user_id)
            .await
            .map_err(CredentialError::store)?;
        Ok(stored.or_else(|| self.defaults.git_hosting_token.clone()))
    }
}

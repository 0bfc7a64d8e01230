//! Credentials resolved for one task run.

use super::{ApiProvider, CredentialError, Secret};
use crate::agent::domain::AgentKind;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Environment variables Copilot reads the git-hosting token from.
const COPILOT_TOKEN_VARS: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Process-wide credentials for the remote sandbox provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SandboxCredentials {
    /// Provider API token.
    pub token: Option<Secret>,
    /// Provider team or organisation identifier.
    pub team_id: Option<String>,
    /// Provider project identifier.
    pub project_id: Option<String>,
}

impl SandboxCredentials {
    /// Checks that every provider credential is present.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MissingSandboxCredential`] naming the
    /// first missing field.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.token.is_none() {
            return Err(CredentialError::MissingSandboxCredential("token"));
        }
        if self.team_id.as_deref().is_none_or(|id| id.trim().is_empty()) {
            return Err(CredentialError::MissingSandboxCredential("team_id"));
        }
        if self
            .project_id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty())
        {
            return Err(CredentialError::MissingSandboxCredential("project_id"));
        }
        Ok(())
    }
}

/// API keys and tokens available to a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCredentials {
    api_keys: BTreeMap<ApiProvider, Secret>,
    git_hosting_token: Option<Secret>,
    sandbox: SandboxCredentials,
}

impl ResolvedCredentials {
    /// Creates an empty credential set.
    #[must_use]
    pub fn new(sandbox: SandboxCredentials) -> Self {
        Self {
            api_keys: BTreeMap::new(),
            git_hosting_token: None,
            sandbox,
        }
    }

    /// Adds an API key.
    #[must_use]
    pub fn with_api_key(mut self, provider: ApiProvider, key: Secret) -> Self {
        self.api_keys.insert(provider, key);
        self
    }

    /// Sets the git-hosting token.
    #[must_use]
    pub fn with_git_hosting_token(mut self, token: Secret) -> Self {
        self.git_hosting_token = Some(token);
        self
    }

    /// Returns the key for `provider`, if resolved.
    #[must_use]
    pub fn api_key(&self, provider: ApiProvider) -> Option<&Secret> {
        self.api_keys.get(&provider)
    }

    /// Returns the git-hosting token, if resolved.
    #[must_use]
    pub const fn git_hosting_token(&self) -> Option<&Secret> {
        self.git_hosting_token.as_ref()
    }

    /// Returns the sandbox provider credentials.
    #[must_use]
    pub const fn sandbox(&self) -> &SandboxCredentials {
        &self.sandbox
    }

    /// Checks that `agent` has a usable credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MissingApiKey`] when none of the agent's
    /// providers has a key, or [`CredentialError::MissingGitHostingToken`]
    /// for Copilot without a git-hosting token.
    pub fn ensure_agent_ready(&self, agent: AgentKind) -> Result<(), CredentialError> {
        if agent == AgentKind::Copilot {
            return self
                .git_hosting_token
                .as_ref()
                .map(|_| ())
                .ok_or(CredentialError::MissingGitHostingToken);
        }
        let providers = ApiProvider::for_agent(agent);
        if providers.iter().any(|provider| self.api_keys.contains_key(provider)) {
            return Ok(());
        }
        let variables = providers
            .iter()
            .map(|provider| provider.env_var())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(CredentialError::MissingApiKey { agent, variables })
    }

    /// Returns only the environment variables relevant to `agent`.
    #[must_use]
    pub fn env_for(&self, agent: AgentKind) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = ApiProvider::for_agent(agent)
            .iter()
            .filter_map(|provider| {
                self.api_keys
                    .get(provider)
                    .map(|key| (provider.env_var().to_owned(), key.expose().to_owned()))
            })
            .collect();
        if agent == AgentKind::Copilot
            && let Some(token) = &self.git_hosting_token
        {
            for variable in COPILOT_TOKEN_VARS {
                env.insert(variable.to_owned(), token.expose().to_owned());
            }
        }
        env
    }

    /// Returns every plaintext secret, for log redaction.
    #[must_use]
    pub fn secret_values(&self) -> Vec<String> {
        self.api_keys
            .values()
            .chain(self.git_hosting_token.as_ref())
            .chain(self.sandbox.token.as_ref())
            .map(|secret| secret.expose().to_owned())
            .collect()
    }
}

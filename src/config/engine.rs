//! Top-level configuration document.

use super::{ConfigError, overrides};
use crate::credentials::services::CredentialDefaults;
use crate::naming::services::BranchNamingSettings;
use crate::pull_request::services::GitHostingSettings;
use crate::rate_limit::RateLimitSettings;
use crate::runner::{MAX_PROVISION_ATTEMPTS, TaskSettings};
use crate::sandbox::services::SandboxSettings;
use crate::telemetry::LoggingConfig;
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

/// Variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "FOREMAN_CONFIG";

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Sandbox defaults.
    pub sandbox: SandboxSettings,
    /// Task run limits.
    pub tasks: TaskSettings,
    /// Daily quota.
    pub rate_limit: RateLimitSettings,
    /// Process-wide credential fallbacks.
    pub credentials: CredentialDefaults,
    /// Branch name generation.
    pub branch_naming: BranchNamingSettings,
    /// Git-hosting API.
    pub git_hosting: GitHostingSettings,
    /// Log output.
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents or unknown
    /// sections.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads and parses the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it does not parse.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let file_name = path.file_name().ok_or_else(|| {
            ConfigError::read(path, std::io::Error::other("path must include a file name"))
        })?;
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|err| ConfigError::read(path, err))?;
        let text = dir
            .read_to_string(file_name)
            .map_err(|err| ConfigError::read(path, err))?;
        debug!(path = %path, "configuration file read");
        Self::from_toml_str(&text)
    }

    /// Applies environment overrides obtained through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVariable`] when a numeric variable does
    /// not parse.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        overrides::apply(&mut self, &lookup)?;
        Ok(self)
    }

    /// Loads the file named by `FOREMAN_CONFIG`, if set, applies overrides
    /// from the process environment and validates the result.
    ///
    /// # Errors
    ///
    /// Returns any [`ConfigError`] raised while reading, overriding or
    /// validating.
    pub fn from_process_env() -> Result<Self, ConfigError> {
        let lookup = |name: &str| std::env::var(name).ok();
        let base = match lookup(CONFIG_PATH_VAR).filter(|path| !path.trim().is_empty()) {
            Some(path) => Self::load(Utf8Path::new(path.trim()))?,
            None => Self::default(),
        };
        let config = base.with_env_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that cannot be expressed through types alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tasks = &self.tasks;
        if !(1..=MAX_PROVISION_ATTEMPTS).contains(&tasks.provision_attempts) {
            return Err(ConfigError::Invalid(format!(
                "tasks.provision_attempts must be between 1 and {MAX_PROVISION_ATTEMPTS}"
            )));
        }
        if tasks.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "tasks.queue_capacity must be at least 1".to_owned(),
            ));
        }
        if tasks.default_max_duration_minutes == 0
            || tasks.default_max_duration_minutes > tasks.max_duration_limit_minutes
        {
            return Err(ConfigError::Invalid(format!(
                "tasks.default_max_duration_minutes must be between 1 and {}",
                tasks.max_duration_limit_minutes
            )));
        }
        if self.branch_naming.max_length == 0 {
            return Err(ConfigError::Invalid(
                "branch_naming.max_length must be at least 1".to_owned(),
            ));
        }
        Regex::new(&self.git_hosting.preview_url_pattern).map_err(|err| {
            ConfigError::Invalid(format!("git_hosting.preview_url_pattern: {err}"))
        })?;
        Ok(())
    }
}

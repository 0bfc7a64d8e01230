//! Environment variable overrides.

use super::{ConfigError, EngineConfig};
use crate::credentials::domain::{ApiProvider, Secret};

/// Sandbox provider API token.
pub const SANDBOX_TOKEN_VAR: &str = "FOREMAN_SANDBOX_TOKEN";
/// Sandbox provider team identifier.
pub const SANDBOX_TEAM_VAR: &str = "FOREMAN_SANDBOX_TEAM_ID";
/// Sandbox provider project identifier.
pub const SANDBOX_PROJECT_VAR: &str = "FOREMAN_SANDBOX_PROJECT_ID";
/// Default git-hosting token.
pub const GIT_HOSTING_TOKEN_VAR: &str = "GITHUB_TOKEN";
/// API key for branch name generation.
pub const BRANCH_NAMING_API_KEY_VAR: &str = "FOREMAN_BRANCH_NAMING_API_KEY";
/// Default daily request limit.
pub const DAILY_LIMIT_VAR: &str = "FOREMAN_DAILY_LIMIT";
/// Largest task duration in minutes.
pub const MAX_DURATION_VAR: &str = "FOREMAN_MAX_DURATION_MINUTES";
/// Log filter directives.
pub const LOG_FILTER_VAR: &str = "FOREMAN_LOG";

/// Applies every recognised variable `lookup` returns. Blank values are
/// ignored.
pub(super) fn apply(
    config: &mut EngineConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(token) = read(SANDBOX_TOKEN_VAR).and_then(Secret::new) {
        config.credentials.sandbox.token = Some(token);
    }
    if let Some(team) = read(SANDBOX_TEAM_VAR) {
        config.credentials.sandbox.team_id = Some(team.trim().to_owned());
    }
    if let Some(project) = read(SANDBOX_PROJECT_VAR) {
        config.credentials.sandbox.project_id = Some(project.trim().to_owned());
    }
    for provider in ApiProvider::ALL {
        if let Some(key) = read(provider.env_var()).and_then(Secret::new) {
            config.credentials.api_keys.insert(provider, key);
        }
    }
    if let Some(token) = read(GIT_HOSTING_TOKEN_VAR).and_then(Secret::new) {
        config.credentials.git_hosting_token = Some(token);
    }
    if let Some(key) = read(BRANCH_NAMING_API_KEY_VAR).and_then(Secret::new) {
        config.branch_naming.api_key = Some(key);
    }
    if let Some(raw) = read(DAILY_LIMIT_VAR) {
        config.rate_limit.daily_limit = parse_number(DAILY_LIMIT_VAR, &raw)?;
    }
    if let Some(raw) = read(MAX_DURATION_VAR) {
        config.tasks.max_duration_limit_minutes = parse_number(MAX_DURATION_VAR, &raw)?;
    }
    if let Some(filter) = read(LOG_FILTER_VAR) {
        config.logging.filter = filter.trim().to_owned();
    }
    Ok(())
}

fn parse_number(variable: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|err: std::num::ParseIntError| ConfigError::InvalidVariable {
            variable,
            reason: format!("`{}` is not a whole number: {err}", raw.trim()),
        })
}

//! Engine configuration.
//!
//! [`EngineConfig`] is read from a TOML file and then overridden from
//! environment variables. Every section has defaults, so an empty file is a
//! valid configuration; credentials normally arrive through the
//! environment.

mod engine;
mod error;
mod overrides;

pub use engine::{CONFIG_PATH_VAR, EngineConfig};
pub use error::ConfigError;
pub use overrides::{
    BRANCH_NAMING_API_KEY_VAR, DAILY_LIMIT_VAR, GIT_HOSTING_TOKEN_VAR, LOG_FILTER_VAR,
    MAX_DURATION_VAR, SANDBOX_PROJECT_VAR, SANDBOX_TEAM_VAR, SANDBOX_TOKEN_VAR,
};

#[cfg(test)]
mod tests;

//! Process-wide `tracing` subscriber setup.

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
    /// Whether to emit ANSI colours.
    pub ansi: bool,
    /// Whether to include the event target.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            ansi: true,
            with_target: false,
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Clone, Error)]
pub enum TelemetryError {
    /// The filter directives did not parse.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// Directives as configured.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Builds the event filter: `RUST_LOG` when set, the configured
/// directives otherwise.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the configured directives
/// do not parse.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|err| TelemetryError::InvalidFilter {
        filter: config.filter.clone(),
        reason: err.to_string(),
    })
}

/// Installs a formatting subscriber as the global default.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for unparseable directives and
/// [`TelemetryError::AlreadyInstalled`] when called twice.
pub fn init(config: &LoggingConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))
}

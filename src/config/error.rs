//! Configuration errors.

use camino::Utf8PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was requested.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: Arc<std::io::Error>,
    },

    /// The file is not valid TOML for [`super::EngineConfig`].
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// An environment variable holds an unusable value.
    #[error("environment variable {variable} is invalid: {reason}")]
    InvalidVariable {
        /// Variable name.
        variable: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The combined configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(super) fn read(path: &camino::Utf8Path, err: std::io::Error) -> Self {
        Self::Read {
            path: path.to_owned(),
            source: Arc::new(err),
        }
    }
}

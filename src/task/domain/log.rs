//! User-visible task log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a task log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Progress information.
    Info,
    /// A step finished successfully.
    Success,
    /// A step failed.
    Error,
    /// A command executed in the sandbox.
    Command,
}

impl LogLevel {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
            Self::Command => "command",
        }
    }
}

/// A single entry in a task's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Entry severity.
    pub level: LogLevel,
    /// Already-redacted message text.
    pub message: String,
    /// Time the entry was produced.
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Creates a log entry.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp,
        }
    }
}

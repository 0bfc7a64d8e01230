//! User-visible task log with secret redaction.

use crate::task::{
    domain::{LogEntry, LogLevel, TaskId},
    ports::TaskStore,
};
use mockable::Clock;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

/// Replacement text for redacted values.
pub const REDACTED: &str = "[REDACTED]";

static TOKEN_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bbearer\s+[a-z0-9._~+/=-]+|\b(?:sk-[a-z0-9_-]{8,}|ghp_[a-z0-9]{16,}|github_pat_[a-z0-9_]{16,})",
    )
    .ok()
});

/// Removes credential values and token-shaped substrings from text.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Creates a redactor for the given plaintext secrets.
    #[must_use]
    pub fn new(secrets: impl IntoIterator<Item = String>) -> Self {
        let mut redactor = Self::default();
        redactor.extend(secrets);
        redactor
    }

    /// Adds more secrets.
    pub fn extend(&mut self, secrets: impl IntoIterator<Item = String>) {
        self.secrets
            .extend(secrets.into_iter().filter(|secret| !secret.is_empty()));
        // Longer values first, so a secret containing another is fully hidden.
        self.secrets
            .sort_by(|left, right| right.len().cmp(&left.len()).then_with(|| left.cmp(right)));
        self.secrets.dedup();
    }

    /// Returns `text` with every known secret and token replaced.
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_owned();
        for secret in &self.secrets {
            redacted = redacted.replace(secret.as_str(), REDACTED);
        }
        let Some(pattern) = TOKEN_PATTERN.as_ref() else {
            return redacted;
        };
        pattern.replace_all(&redacted, REDACTED).into_owned()
    }
}

/// Appends redacted entries to one task's log.
///
/// Persisting a log entry is best-effort: failures are reported through
/// `tracing` and never fail the run.
pub struct TaskLogger<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    task_id: TaskId,
    redactor: Redactor,
}

impl<S, C> TaskLogger<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a logger for `task_id`.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>, task_id: TaskId) -> Self {
        Self {
            store,
            clock,
            task_id,
            redactor: Redactor::default(),
        }
    }

    /// Registers secrets that must never reach the log.
    pub fn add_secrets(&mut self, secrets: impl IntoIterator<Item = String>) {
        self.redactor.extend(secrets);
    }

    /// Redacts `text` with the secrets known so far.
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        self.redactor.redact(text)
    }

    /// Logs a progress message.
    pub async fn info(&self, message: impl AsRef<str>) {
        self.append(LogLevel::Info, message.as_ref()).await;
    }

    /// Logs a completed step.
    pub async fn success(&self, message: impl AsRef<str>) {
        self.append(LogLevel::Success, message.as_ref()).await;
    }

    /// Logs a failure.
    pub async fn error(&self, message: impl AsRef<str>) {
        self.append(LogLevel::Error, message.as_ref()).await;
    }

    /// Logs a command being run.
    pub async fn command(&self, message: impl AsRef<str>) {
        self.append(LogLevel::Command, message.as_ref()).await;
    }

    async fn append(&self, level: LogLevel, message: &str) {
        let text = self.redactor.redact(message);
        info!(task_id = %self.task_id, level = level.as_str(), message = %text, "task log");
        let entry = LogEntry::new(level, text, self.clock.utc());
        if let Err(err) = self
            .store
            .append_log_entries(&self.task_id, vec![entry])
            .await
        {
            warn!(task_id = %self.task_id, error = %err, "failed to persist task log");
        }
    }
}

//! Branch-name value object for task branches.

use super::{TaskDomainError, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Maximum length for any stored branch name.
const MAX_BRANCH_NAME_LENGTH: usize = 200;

/// Prefix used by deterministic fallback branch names.
const FALLBACK_PREFIX: &str = "agent/";

/// Number of task-identifier characters embedded in fallback names.
const FALLBACK_ID_CHARS: usize = 8;

/// Validated Git branch name.
///
/// Branch names must be non-empty after trimming, must not contain
/// whitespace, colons or `..`, and must not exceed 200 characters. Names
/// produced by the branch namer are held to the stricter
/// [`BranchName::strict`] rules.
///
/// # Examples
///
///     use foreman::task::domain::BranchName;
///
///     let name = BranchName::new("feature/health-endpoint").expect("valid");
///     assert_eq!(name.as_str(), "feature/health-endpoint");
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidBranchName`] when the value is empty,
    /// contains forbidden characters, or exceeds the length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();

        if Self::is_invalid_branch_name(normalized) {
            return Err(TaskDomainError::InvalidBranchName(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Creates a branch name under the strict generated-name contract.
    ///
    /// Only `[a-z0-9-/]` is accepted, the name may not start or end with a
    /// separator, may not contain `//`, and may not exceed `max_length`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidBranchName`] when any rule fails.
    pub fn strict(value: &str, max_length: usize) -> Result<Self, TaskDomainError> {
        let allowed = value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '/');
        let bad_edges = value.starts_with(['-', '/']) || value.ends_with(['-', '/']);
        let is_valid = !value.is_empty()
            && value.len() <= max_length
            && allowed
            && !bad_edges
            && !value.contains("//");

        if !is_valid {
            return Err(TaskDomainError::InvalidBranchName(value.to_owned()));
        }
        Self::new(value)
    }

    /// Builds the deterministic fallback name for a task.
    ///
    /// The result has the shape `agent/<YYYY-MM-DDTHH-MM-SS>-<8 chars>`,
    /// where the trailing segment is the first eight lowercase alphanumeric
    /// characters of the task identifier. Identifiers with fewer usable
    /// characters are padded from a SHA-256 digest of the identifier.
    ///
    /// Only those eight characters distinguish tasks named in the same
    /// second. Generated identifiers are random hex and differ there, but
    /// client-assigned identifiers such as `AbCdEfGh1` and `abcdefgh2`
    /// share a name.
    #[must_use]
    pub fn fallback(task_id: &TaskId, at: DateTime<Utc>) -> Self {
        let timestamp = at.format("%Y-%m-%dT%H-%M-%S");
        let mut suffix: String = task_id
            .as_str()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .take(FALLBACK_ID_CHARS)
            .collect();
        if suffix.len() < FALLBACK_ID_CHARS {
            let digest = format!("{:x}", Sha256::digest(task_id.as_str().as_bytes()));
            let missing = FALLBACK_ID_CHARS - suffix.len();
            suffix.extend(digest.chars().take(missing));
        }
        Self(format!("{FALLBACK_PREFIX}{timestamp}-{suffix}"))
    }

    fn is_invalid_branch_name(name: &str) -> bool {
        let is_empty = name.is_empty();
        let contains_forbidden = name.contains(':')
            || name.contains("..")
            || name.chars().any(|c| c.is_whitespace() || c.is_control());
        let exceeds_length_limit = name.len() > MAX_BRANCH_NAME_LENGTH;

        is_empty || contains_forbidden || exceeds_length_limit
    }

    /// Returns the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

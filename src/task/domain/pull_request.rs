//! Pull-request value objects recorded on tasks.

use super::{ParsePullRequestStatusError, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positive pull request number from the git host.
///
/// Must be positive and representable as a signed 64-bit integer.
///
/// # Examples
///
///     use foreman::task::domain::PullRequestNumber;
///
///     let pr_num = PullRequestNumber::new(42).expect("valid");
///     assert_eq!(pr_num.value(), 42);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Largest pull request number accepted.
    const MAX_PERSISTED_VALUE: u64 = i64::MAX as u64;

    /// Creates a validated pull request number.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidPullRequestNumber`] when the value
    /// is zero or exceeds `i64::MAX`.
    pub const fn new(value: u64) -> Result<Self, TaskDomainError> {
        if value == 0 || value > Self::MAX_PERSISTED_VALUE {
            return Err(TaskDomainError::InvalidPullRequestNumber(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PullRequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pull request state as recorded on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestStatus {
    /// The pull request is open for review.
    Open,
    /// The pull request was closed without merging.
    Closed,
    /// The pull request was merged.
    Merged,
}

impl PullRequestStatus {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Merged => "MERGED",
        }
    }

    /// Maps a git host's `state` vocabulary onto the recorded states.
    ///
    /// A closed pull request with `merged` set (or a host that reports
    /// `merged` directly as a state) maps to [`Self::Merged`].
    ///
    /// # Errors
    ///
    /// Returns [`ParsePullRequestStatusError`] for unknown remote states.
    pub fn from_remote(state: &str, merged: bool) -> Result<Self, ParsePullRequestStatusError> {
        match state.trim().to_ascii_lowercase().as_str() {
            "merged" => Ok(Self::Merged),
            "closed" if merged => Ok(Self::Merged),
            "closed" => Ok(Self::Closed),
            "open" | "opened" | "draft" => Ok(Self::Open),
            _ => Err(ParsePullRequestStatusError(state.to_owned())),
        }
    }
}

impl fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PullRequestStatus {
    type Error = ParsePullRequestStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "MERGED" => Ok(Self::Merged),
            _ => Err(ParsePullRequestStatusError(value.to_owned())),
        }
    }
}

/// Pull request details recorded on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    /// Web URL of the pull request.
    pub url: String,
    /// Pull request number.
    pub number: PullRequestNumber,
    /// Recorded state.
    pub status: PullRequestStatus,
    /// Merge commit reference, present once merged.
    pub merge_commit_sha: Option<String>,
}

impl PullRequestRecord {
    /// Creates an open pull request record.
    #[must_use]
    pub fn open(url: impl Into<String>, number: PullRequestNumber) -> Self {
        Self {
            url: url.into(),
            number,
            status: PullRequestStatus::Open,
            merge_commit_sha: None,
        }
    }

    /// Returns a copy with a different status.
    #[must_use]
    pub fn with_status(mut self, status: PullRequestStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns a copy with the merge commit reference set.
    #[must_use]
    pub fn with_merge_commit(mut self, sha: impl Into<String>) -> Self {
        self.merge_commit_sha = Some(sha.into());
        self
    }
}

/// Merge strategy accepted by the git host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Create a merge commit.
    Merge,
    /// Squash all commits into one.
    #[default]
    Squash,
    /// Rebase commits onto the base branch.
    Rebase,
}

impl MergeMethod {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Squash => "squash",
            Self::Rebase => "rebase",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

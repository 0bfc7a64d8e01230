//! Records exchanged with the git-hosting service.

use crate::task::domain::{
    MergeMethod, ParsePullRequestStatusError, PullRequestNumber, PullRequestRecord,
    PullRequestStatus,
};
use serde::{Deserialize, Serialize};

/// A branch head on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBranch {
    /// Branch name.
    pub name: String,
    /// Head commit SHA.
    pub sha: String,
}

/// A CI check run reported against a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    /// Check name.
    pub name: String,
    /// Link to the check details, often a deployment.
    pub details_url: Option<String>,
    /// Output summary.
    pub summary: Option<String>,
    /// Output body.
    pub text: Option<String>,
}

impl CheckRun {
    /// Returns every text field worth scanning for URLs.
    pub fn searchable_text(&self) -> impl Iterator<Item = &str> {
        [&self.details_url, &self.summary, &self.text]
            .into_iter()
            .filter_map(Option::as_deref)
    }
}

/// Open/closed state as the hosting service reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemotePullRequestState {
    /// Open.
    Open,
    /// Closed, possibly merged.
    Closed,
}

impl RemotePullRequestState {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// A pull request as the hosting service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePullRequest {
    /// Pull request number.
    pub number: u64,
    /// Browser URL.
    pub url: String,
    /// Raw remote state, e.g. `open` or `closed`.
    pub state: String,
    /// Whether the pull request has been merged.
    pub merged: bool,
    /// Merge commit SHA, once merged.
    pub merge_commit_sha: Option<String>,
}

impl RemotePullRequest {
    /// Converts the remote view into the record stored on a task.
    ///
    /// # Errors
    ///
    /// Returns [`RecordConversionError`] for a zero number or an unknown
    /// remote state.
    pub fn to_record(&self) -> Result<PullRequestRecord, RecordConversionError> {
        let number = PullRequestNumber::new(self.number)
            .map_err(|_| RecordConversionError::InvalidNumber(self.number))?;
        let status = PullRequestStatus::from_remote(&self.state, self.merged)?;
        let record = PullRequestRecord::open(self.url.clone(), number).with_status(status);
        Ok(match &self.merge_commit_sha {
            Some(sha) if self.merged => record.with_merge_commit(sha.clone()),
            _ => record,
        })
    }
}

/// Failure to map a remote pull request onto a task record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordConversionError {
    /// The remote number is zero.
    #[error("invalid pull request number {0}")]
    InvalidNumber(u64),
    /// The remote state is unknown.
    #[error(transparent)]
    State(#[from] ParsePullRequestStatusError),
}

/// Fields for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPullRequest {
    /// Title.
    pub title: String,
    /// Body in Markdown.
    pub body: String,
    /// Source branch.
    pub head: String,
    /// Target branch.
    pub base: String,
}

/// Options for merging a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeRequest {
    /// Merge strategy.
    pub method: MergeMethod,
    /// Commit title override.
    pub commit_title: Option<String>,
    /// Commit message override.
    pub commit_message: Option<String>,
}

/// Result of a merge call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Whether the merge happened.
    pub merged: bool,
    /// Merge commit SHA.
    pub sha: Option<String>,
}

//! Git-hosting API facade.

use crate::credentials::domain::Secret;
use crate::pull_request::domain::{
    CheckRun, MergeOutcome, MergeRequest, NewPullRequest, RemoteBranch, RemotePullRequest,
    RemotePullRequestState,
};
use crate::task::domain::RepositoryFullName;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for git-hosting calls.
pub type GitHostingResult<T> = Result<T, GitHostingError>;

/// Operations the engine needs from the git-hosting service.
///
/// Every call carries the token of the user acting on the task.
#[async_trait]
pub trait GitHostingApi: Send + Sync {
    /// Returns the head of `branch`.
    async fn get_branch(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        branch: &str,
    ) -> GitHostingResult<RemoteBranch>;

    /// Lists check runs reported against `git_ref`.
    async fn list_check_runs(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        git_ref: &str,
    ) -> GitHostingResult<Vec<CheckRun>>;

    /// Opens a pull request.
    async fn create_pull_request(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        request: &NewPullRequest,
    ) -> GitHostingResult<RemotePullRequest>;

    /// Merges a pull request.
    async fn merge_pull_request(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        number: u64,
        request: &MergeRequest,
    ) -> GitHostingResult<MergeOutcome>;

    /// Opens or closes a pull request.
    async fn update_pull_request_state(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        number: u64,
        state: RemotePullRequestState,
    ) -> GitHostingResult<RemotePullRequest>;

    /// Fetches a pull request.
    async fn get_pull_request(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        number: u64,
    ) -> GitHostingResult<RemotePullRequest>;
}

/// Normalised git-hosting failures.
#[derive(Debug, Clone, Error)]
pub enum GitHostingError {
    /// The repository, branch or pull request does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The token was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The operation conflicts with the current remote state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The service rejected the request as invalid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The service is rate limiting the caller.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The service could not be reached or answered unexpectedly.
    #[error("git hosting transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl GitHostingError {
    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}

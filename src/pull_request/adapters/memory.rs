//! In-memory git-hosting service for tests.

use crate::credentials::domain::Secret;
use crate::pull_request::{
    domain::{
        CheckRun, MergeOutcome, MergeRequest, NewPullRequest, RemoteBranch, RemotePullRequest,
        RemotePullRequestState,
    },
    ports::{GitHostingApi, GitHostingError, GitHostingResult},
};
use crate::task::domain::RepositoryFullName;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory hosting service keyed by repository.
///
/// Pull request URLs have the shape `https://git.test/<repo>/pull/<n>`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGitHosting {
    state: Arc<Mutex<HostingState>>,
}

#[derive(Debug, Default)]
struct HostingState {
    accepted_token: Option<String>,
    branches: HashMap<(String, String), String>,
    check_runs: HashMap<String, Vec<CheckRun>>,
    pulls: HashMap<(String, u64), RemotePullRequest>,
    merges: Vec<(u64, MergeRequest)>,
    merge_error: Option<GitHostingError>,
    next_number: u64,
}

impl InMemoryGitHosting {
    /// Creates an empty service that accepts any token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every token except `token`.
    pub fn accept_only(&self, token: impl Into<String>) {
        let accepted = token.into();
        self.with_state(|state| state.accepted_token = Some(accepted));
    }

    /// Adds a branch head.
    pub fn add_branch(&self, repo: &RepositoryFullName, branch: &str, sha: &str) {
        self.with_state(|state| {
            state
                .branches
                .insert((repo.as_str().to_owned(), branch.to_owned()), sha.to_owned());
        });
    }

    /// Adds a check run for a commit.
    pub fn add_check_run(&self, sha: &str, run: CheckRun) {
        self.with_state(|state| state.check_runs.entry(sha.to_owned()).or_default().push(run));
    }

    /// Makes the next merge calls fail with `error`.
    pub fn fail_merges(&self, error: GitHostingError) {
        self.with_state(|state| state.merge_error = Some(error));
    }

    /// Returns every merge request received.
    #[must_use]
    pub fn merges(&self) -> Vec<(u64, MergeRequest)> {
        self.with_state(|state| state.merges.clone())
    }

    /// Returns a stored pull request.
    #[must_use]
    pub fn pull_request(&self, repo: &RepositoryFullName, number: u64) -> Option<RemotePullRequest> {
        self.with_state(|state| state.pulls.get(&(repo.as_str().to_owned(), number)).cloned())
    }

    fn with_state<T>(&self, action: impl FnOnce(&mut HostingState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        action(&mut state)
    }

    fn authorised<T>(
        &self,
        token: &Secret,
        action: impl FnOnce(&mut HostingState) -> GitHostingResult<T>,
    ) -> GitHostingResult<T> {
        self.with_state(|state| {
            if state
                .accepted_token
                .as_deref()
                .is_some_and(|accepted| accepted != token.expose())
            {
                return Err(GitHostingError::Unauthorized("bad credentials".to_owned()));
            }
            action(state)
        })
    }
}

fn pull_mut<'a>(
    state: &'a mut HostingState,
    repo: &RepositoryFullName,
    number: u64,
) -> GitHostingResult<&'a mut RemotePullRequest> {
    state
        .pulls
        .get_mut(&(repo.as_str().to_owned(), number))
        .ok_or_else(|| GitHostingError::NotFound(format!("pull request #{number}")))
}

#[async_trait]
impl GitHostingApi for InMemoryGitHosting {
    async fn get_branch(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        branch: &str,
    ) -> GitHostingResult<RemoteBranch> {
        self.authorised(token, |state| {
            state
                .branches
                .get(&(repo.as_str().to_owned(), branch.to_owned()))
                .map(|sha| RemoteBranch {
                    name: branch.to_owned(),
                    sha: sha.clone(),
                })
                .ok_or_else(|| GitHostingError::NotFound(format!("branch {branch}")))
        })
    }

    async fn list_check_runs(
        &self,
        token: &Secret,
        _repo: &RepositoryFullName,
        git_ref: &str,
    ) -> GitHostingResult<Vec<CheckRun>> {
        self.authorised(token, |state| {
            Ok(state.check_runs.get(git_ref).cloned().unwrap_or_default())
        })
    }

    async fn create_pull_request(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        request: &NewPullRequest,
    ) -> GitHostingResult<RemotePullRequest> {
        self.authorised(token, |state| {
            if request.title.trim().is_empty() {
                return Err(GitHostingError::Validation("title is required".to_owned()));
            }
            let duplicate = state.pulls.iter().any(|((pull_repo, _), pull)| {
                pull_repo == repo.as_str() && pull.state == "open" && pull.url.contains(&request.head)
            });
            if duplicate {
                return Err(GitHostingError::Validation(format!(
                    "a pull request already exists for {}",
                    request.head
                )));
            }
            state.next_number += 1;
            let number = state.next_number;
            let pull = RemotePullRequest {
                number,
                url: format!("https://git.test/{repo}/pull/{number}?head={}", request.head),
                state: "open".to_owned(),
                merged: false,
                merge_commit_sha: None,
            };
            state
                .pulls
                .insert((repo.as_str().to_owned(), number), pull.clone());
            Ok(pull)
        })
    }

    async fn merge_pull_request(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        number: u64,
        request: &MergeRequest,
    ) -> GitHostingResult<MergeOutcome> {
        self.authorised(token, |state| {
            if let Some(error) = state.merge_error.clone() {
                return Err(error);
            }
            state.merges.push((number, request.clone()));
            let pull = pull_mut(state, repo, number)?;
            if pull.state != "open" {
                return Err(GitHostingError::Conflict(format!(
                    "pull request #{number} is not open"
                )));
            }
            let sha = format!("merge-{number}");
            pull.state = "closed".to_owned();
            pull.merged = true;
            pull.merge_commit_sha = Some(sha.clone());
            Ok(MergeOutcome {
                merged: true,
                sha: Some(sha),
            })
        })
    }

    async fn update_pull_request_state(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        number: u64,
        state: RemotePullRequestState,
    ) -> GitHostingResult<RemotePullRequest> {
        self.authorised(token, |hosting| {
            let pull = pull_mut(hosting, repo, number)?;
            if pull.merged {
                return Err(GitHostingError::Validation(format!(
                    "pull request #{number} is already merged"
                )));
            }
            state.as_str().clone_into(&mut pull.state);
            Ok(pull.clone())
        })
    }

    async fn get_pull_request(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        number: u64,
    ) -> GitHostingResult<RemotePullRequest> {
        self.authorised(token, |state| pull_mut(state, repo, number).map(|pull| pull.clone()))
    }
}

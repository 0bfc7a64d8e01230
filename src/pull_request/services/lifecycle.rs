//! Pull-request operations on task branches.

use crate::credentials::{
    domain::{CredentialError, Secret},
    services::CredentialResolver,
};
use crate::pull_request::{
    adapters::github::GITHUB_API_URL,
    domain::{MergeRequest, NewPullRequest, RecordConversionError, RemotePullRequestState},
    ports::{GitHostingApi, GitHostingError},
};
use crate::task::{
    domain::{PullRequestRecord, PullRequestStatus, Task, TaskChanges, TaskId},
    ports::{TaskStore, TaskStoreError},
};
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Git-hosting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitHostingSettings {
    /// REST API root.
    pub api_url: String,
    /// Base branch for new pull requests.
    pub default_base_branch: String,
    /// Pattern matched against check runs to find preview deployments.
    pub preview_url_pattern: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GitHostingSettings {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_URL.to_owned(),
            default_base_branch: "main".to_owned(),
            preview_url_pattern: r"https://[a-z0-9][a-z0-9.-]*\.vercel\.app".to_owned(),
            timeout_seconds: 30,
        }
    }
}

/// Fields for opening a task's pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequest {
    /// Title.
    pub title: String,
    /// Body in Markdown.
    pub body: String,
    /// Target branch; the configured default when `None`.
    pub base: Option<String>,
}

/// Errors returned by [`PullRequestService`].
#[derive(Debug, Clone, Error)]
pub enum PullRequestError {
    /// Credentials are missing or could not be loaded.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// The task has no branch yet.
    #[error("task {0} has no branch")]
    MissingBranch(TaskId),

    /// The task has no pull request.
    #[error("task {0} has no pull request")]
    NoPullRequest(TaskId),

    /// The task already has an open pull request.
    #[error("task {task_id} already has open pull request #{number}")]
    AlreadyOpen {
        /// Task identifier.
        task_id: TaskId,
        /// Existing pull request number.
        number: u64,
    },

    /// The pull request is not open.
    #[error("pull request of task {task_id} is {status}")]
    NotOpen {
        /// Task identifier.
        task_id: TaskId,
        /// Recorded status.
        status: PullRequestStatus,
    },

    /// The hosting service declined to merge.
    #[error("merge was not performed")]
    MergeRejected,

    /// The remote pull request could not be recorded.
    #[error(transparent)]
    InvalidRemote(#[from] RecordConversionError),

    /// The preview URL pattern is not a valid regular expression.
    #[error("invalid preview URL pattern: {0}")]
    InvalidPreviewPattern(String),

    /// The hosting service failed.
    #[error(transparent)]
    Hosting(#[from] GitHostingError),

    /// The task store failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

impl PullRequestError {
    /// Returns `true` for errors caused by missing configuration.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Credentials(CredentialError::MissingGitHostingToken)
                | Self::InvalidPreviewPattern(_)
        )
    }
}

/// Creates, merges, closes, reopens and synchronises task pull requests.
pub struct PullRequestService<S>
where
    S: TaskStore,
{
    api: Arc<dyn GitHostingApi>,
    store: Arc<S>,
    credentials: CredentialResolver,
    default_base_branch: String,
    preview_pattern: Regex,
}

impl<S> PullRequestService<S>
where
    S: TaskStore,
{
    /// Creates a service.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestError::InvalidPreviewPattern`] when the preview
    /// URL pattern does not compile.
    pub fn new(
        api: Arc<dyn GitHostingApi>,
        store: Arc<S>,
        credentials: CredentialResolver,
        settings: &GitHostingSettings,
    ) -> Result<Self, PullRequestError> {
        let preview_pattern = Regex::new(&settings.preview_url_pattern)
            .map_err(|err| PullRequestError::InvalidPreviewPattern(err.to_string()))?;
        Ok(Self {
            api,
            store,
            credentials,
            default_base_branch: settings.default_base_branch.clone(),
            preview_pattern,
        })
    }

    /// Opens a pull request from the task branch and records it.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestError`] when the task has no branch, already has
    /// an open pull request, no token is available, or the hosting service
    /// or store fails.
    #[instrument(skip_all, fields(task_id = %task.id()))]
    pub async fn create(
        &self,
        task: &Task,
        request: CreatePullRequest,
    ) -> Result<PullRequestRecord, PullRequestError> {
        if let Some(existing) = task.pull_request()
            && existing.status == PullRequestStatus::Open
        {
            return Err(PullRequestError::AlreadyOpen {
                task_id: task.id().clone(),
                number: existing.number.value(),
            });
        }
        let branch = task
            .branch_name()
            .ok_or_else(|| PullRequestError::MissingBranch(task.id().clone()))?;
        let token = self.token(task).await?;
        let remote = self
            .api
            .create_pull_request(
                &token,
                task.repository(),
                &NewPullRequest {
                    title: request.title,
                    body: request.body,
                    head: branch.as_str().to_owned(),
                    base: request
                        .base
                        .unwrap_or_else(|| self.default_base_branch.clone()),
                },
            )
            .await?;
        let record = remote.to_record()?;
        info!(number = record.number.value(), "pull request opened");
        self.persist(task, record).await
    }

    /// Merges the task's open pull request.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestError`] when there is no open pull request, the
    /// merge is refused, or the hosting service or store fails.
    #[instrument(skip_all, fields(task_id = %task.id(), method = %merge.method))]
    pub async fn merge(
        &self,
        task: &Task,
        merge: MergeRequest,
    ) -> Result<PullRequestRecord, PullRequestError> {
        let current = Self::open_record(task)?;
        let token = self.token(task).await?;
        let outcome = self
            .api
            .merge_pull_request(&token, task.repository(), current.number.value(), &merge)
            .await?;
        if !outcome.merged {
            return Err(PullRequestError::MergeRejected);
        }
        let merged = current.clone().with_status(PullRequestStatus::Merged);
        let record = match outcome.sha {
            Some(sha) => merged.with_merge_commit(sha),
            None => merged,
        };
        info!(number = record.number.value(), "pull request merged");
        self.persist(task, record).await
    }

    /// Closes the task's open pull request without merging.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestError`] when there is no open pull request or
    /// the hosting service or store fails.
    pub async fn close(&self, task: &Task) -> Result<PullRequestRecord, PullRequestError> {
        let current = Self::open_record(task)?;
        self.set_state(task, current, RemotePullRequestState::Closed)
            .await
    }

    /// Reopens the task's closed pull request.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestError::NotOpen`] unless the pull request is
    /// closed and unmerged, or another [`PullRequestError`] when the hosting
    /// service or store fails.
    pub async fn reopen(&self, task: &Task) -> Result<PullRequestRecord, PullRequestError> {
        let current = Self::record(task)?;
        if current.status != PullRequestStatus::Closed {
            return Err(PullRequestError::NotOpen {
                task_id: task.id().clone(),
                status: current.status,
            });
        }
        self.set_state(task, current, RemotePullRequestState::Open)
            .await
    }

    /// Refreshes the recorded status from the hosting service.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestError`] when the task has no pull request or the
    /// hosting service or store fails.
    pub async fn sync_status(&self, task: &Task) -> Result<PullRequestRecord, PullRequestError> {
        let current = Self::record(task)?;
        let token = self.token(task).await?;
        let remote = self
            .api
            .get_pull_request(&token, task.repository(), current.number.value())
            .await?;
        let record = remote.to_record()?;
        if record == *current {
            debug!(task_id = %task.id(), "pull request status unchanged");
            return Ok(record);
        }
        self.persist(task, record).await
    }

    /// Finds a preview deployment URL in the check runs of the task branch.
    ///
    /// Every failure is logged and yields `None`.
    pub async fn discover_preview_url(&self, task: &Task) -> Option<String> {
        let branch = task.branch_name()?;
        let token = match self.token(task).await {
            Ok(token) => token,
            Err(err) => {
                debug!(task_id = %task.id(), error = %err, "preview discovery skipped");
                return None;
            }
        };
        let head = match self
            .api
            .get_branch(&token, task.repository(), branch.as_str())
            .await
        {
            Ok(head) => head,
            Err(err) => {
                warn!(task_id = %task.id(), error = %err, "branch lookup failed");
                return None;
            }
        };
        let runs = match self
            .api
            .list_check_runs(&token, task.repository(), &head.sha)
            .await
        {
            Ok(runs) => runs,
            Err(err) => {
                warn!(task_id = %task.id(), error = %err, "check run lookup failed");
                return None;
            }
        };
        runs.iter()
            .flat_map(|run| run.searchable_text())
            .find_map(|text| self.preview_pattern.find(text))
            .map(|found| found.as_str().to_owned())
    }

    async fn set_state(
        &self,
        task: &Task,
        current: &PullRequestRecord,
        state: RemotePullRequestState,
    ) -> Result<PullRequestRecord, PullRequestError> {
        let token = self.token(task).await?;
        let remote = self
            .api
            .update_pull_request_state(&token, task.repository(), current.number.value(), state)
            .await?;
        let record = remote.to_record()?;
        info!(task_id = %task.id(), status = %record.status, "pull request state updated");
        self.persist(task, record).await
    }

    async fn token(&self, task: &Task) -> Result<Secret, PullRequestError> {
        self.credentials
            .git_hosting_token(task.user_id())
            .await?
            .ok_or(PullRequestError::Credentials(
                CredentialError::MissingGitHostingToken,
            ))
    }

    async fn persist(
        &self,
        task: &Task,
        record: PullRequestRecord,
    ) -> Result<PullRequestRecord, PullRequestError> {
        self.store
            .update_task(task.id(), TaskChanges::new().with_pull_request(record.clone()))
            .await?;
        Ok(record)
    }

    fn record(task: &Task) -> Result<&PullRequestRecord, PullRequestError> {
        task.pull_request()
            .ok_or_else(|| PullRequestError::NoPullRequest(task.id().clone()))
    }

    fn open_record(task: &Task) -> Result<&PullRequestRecord, PullRequestError> {
        let current = Self::record(task)?;
        if current.status == PullRequestStatus::Open {
            Ok(current)
        } else {
            Err(PullRequestError::NotOpen {
                task_id: task.id().clone(),
                status: current.status,
            })
        }
    }
}

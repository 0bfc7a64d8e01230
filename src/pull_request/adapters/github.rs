//! GitHub REST API adapter.

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
use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

/// Public GitHub API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// Client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubApi {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct BranchPayload {
    name: String,
    commit: CommitPayload,
}

#[derive(Deserialize)]
struct CommitPayload {
    sha: String,
}

#[derive(Deserialize)]
struct CheckRunsPayload {
    #[serde(default)]
    check_runs: Vec<CheckRunPayload>,
}

#[derive(Deserialize)]
struct CheckRunPayload {
    name: String,
    details_url: Option<String>,
    #[serde(default)]
    output: CheckOutputPayload,
}

#[derive(Default, Deserialize)]
struct CheckOutputPayload {
    summary: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct PullPayload {
    number: u64,
    html_url: String,
    state: String,
    #[serde(default)]
    merged: bool,
    merge_commit_sha: Option<String>,
}

impl From<PullPayload> for RemotePullRequest {
    fn from(payload: PullPayload) -> Self {
        Self {
            number: payload.number,
            url: payload.html_url,
            state: payload.state,
            merged: payload.merged,
            merge_commit_sha: payload.merge_commit_sha,
        }
    }
}

#[derive(Deserialize)]
struct MergePayload {
    #[serde(default)]
    merged: bool,
    sha: Option<String>,
}

impl GitHubApi {
    /// Creates a client for `base_url`, usually [`GITHUB_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`GitHostingError::Transport`] when the HTTP client cannot
    /// be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GitHostingResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("foreman/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(GitHostingError::transport)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn request(
        &self,
        method: Method,
        token: &Secret,
        repo: &RepositoryFullName,
        path: &str,
    ) -> RequestBuilder {
        let url = format!("{}/repos/{}{path}", self.base_url, repo.as_str());
        self.client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token.expose()))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> GitHostingResult<T> {
        let response = request.send().await.map_err(GitHostingError::transport)?;
        let status = response.status();
        let body = response.text().await.map_err(GitHostingError::transport)?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "git hosting request failed");
            return Err(classify(status, &body));
        }
        serde_json::from_str(&body).map_err(GitHostingError::transport)
    }
}

/// Maps an unsuccessful response onto a [`GitHostingError`].
fn classify(status: StatusCode, body: &str) -> GitHostingError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned());
    let rate_limited = message.to_ascii_lowercase().contains("rate limit");
    match status {
        StatusCode::TOO_MANY_REQUESTS => GitHostingError::RateLimited(message),
        StatusCode::FORBIDDEN if rate_limited => GitHostingError::RateLimited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GitHostingError::Unauthorized(message),
        StatusCode::NOT_FOUND => GitHostingError::NotFound(message),
        StatusCode::CONFLICT | StatusCode::METHOD_NOT_ALLOWED => GitHostingError::Conflict(message),
        StatusCode::UNPROCESSABLE_ENTITY => GitHostingError::Validation(message),
        _ => GitHostingError::transport(std::io::Error::other(format!("{status}: {message}"))),
    }
}

#[async_trait]
impl GitHostingApi for GitHubApi {
    async fn get_branch(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        branch: &str,
    ) -> GitHostingResult<RemoteBranch> {
        let path = format!("/branches/{branch}");
        let payload: BranchPayload =
            Self::send(self.request(Method::GET, token, repo, &path)).await?;
        Ok(RemoteBranch {
            name: payload.name,
            sha: payload.commit.sha,
        })
    }

    async fn list_check_runs(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        git_ref: &str,
    ) -> GitHostingResult<Vec<CheckRun>> {
        let path = format!("/commits/{git_ref}/check-runs");
        let payload: CheckRunsPayload =
            Self::send(self.request(Method::GET, token, repo, &path)).await?;
        Ok(payload
            .check_runs
            .into_iter()
            .map(|run| CheckRun {
                name: run.name,
                details_url: run.details_url,
                summary: run.output.summary,
                text: run.output.text,
            })
            .collect())
    }

    async fn create_pull_request(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        request: &NewPullRequest,
    ) -> GitHostingResult<RemotePullRequest> {
        let body = json!({
            "title": request.title,
            "body": request.body,
            "head": request.head,
            "base": request.base,
        });
        let payload: PullPayload =
            Self::send(self.request(Method::POST, token, repo, "/pulls").json(&body)).await?;
        Ok(payload.into())
    }

    async fn merge_pull_request(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        number: u64,
        request: &MergeRequest,
    ) -> GitHostingResult<MergeOutcome> {
        let mut body = Map::new();
        body.insert("merge_method".to_owned(), json!(request.method.as_str()));
        if let Some(title) = &request.commit_title {
            body.insert("commit_title".to_owned(), json!(title));
        }
        if let Some(message) = &request.commit_message {
            body.insert("commit_message".to_owned(), json!(message));
        }
        let path = format!("/pulls/{number}/merge");
        let payload: MergePayload =
            Self::send(self.request(Method::PUT, token, repo, &path).json(&body)).await?;
        Ok(MergeOutcome {
            merged: payload.merged,
            sha: payload.sha,
        })
    }

    async fn update_pull_request_state(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        number: u64,
        state: RemotePullRequestState,
    ) -> GitHostingResult<RemotePullRequest> {
        let path = format!("/pulls/{number}");
        let body = json!({ "state": state.as_str() });
        let payload: PullPayload =
            Self::send(self.request(Method::PATCH, token, repo, &path).json(&body)).await?;
        Ok(payload.into())
    }

    async fn get_pull_request(
        &self,
        token: &Secret,
        repo: &RepositoryFullName,
        number: u64,
    ) -> GitHostingResult<RemotePullRequest> {
        let path = format!("/pulls/{number}");
        let payload: PullPayload =
            Self::send(self.request(Method::GET, token, repo, &path)).await?;
        Ok(payload.into())
    }
}

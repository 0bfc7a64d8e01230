//! Tests for pull-request operations against the in-memory hosting service.

use std::sync::Arc;

use crate::agent::domain::AgentKind;
use crate::credentials::{
    adapters::memory::InMemoryCredentialStore,
    domain::{CredentialError, Secret},
    services::{CredentialDefaults, CredentialResolver},
};
use crate::pull_request::{
    adapters::memory::InMemoryGitHosting,
    domain::{CheckRun, MergeRequest},
    ports::GitHostingError,
    services::{CreatePullRequest, GitHostingSettings, PullRequestError, PullRequestService},
};
use crate::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{BranchName, MergeMethod, PullRequestStatus, Task, TaskChanges, TaskSpec, UserId},
    ports::TaskStore,
};
use eyre::{Result, bail, ensure, eyre};
use mockable::DefaultClock;
use rstest::rstest;

struct Harness {
    hosting: Arc<InMemoryGitHosting>,
    store: Arc<InMemoryTaskStore>,
    service: PullRequestService<InMemoryTaskStore>,
    task: Task,
}

async fn harness(with_token: bool) -> Result<Harness> {
    let user = UserId::new("user-1")?;
    let credential_store = InMemoryCredentialStore::new();
    if with_token {
        let token = Secret::new("ghp_user").ok_or_else(|| eyre!("blank token"))?;
        credential_store.put_git_hosting_token(user.clone(), token)?;
    }
    let resolver = CredentialResolver::new(
        Arc::new(credential_store),
        Arc::new(CredentialDefaults::default()),
    );

    let store = Arc::new(InMemoryTaskStore::new());
    let spec = TaskSpec::new(
        user,
        "Add a health endpoint",
        "https://github.com/acme/app",
        AgentKind::Claude,
    );
    let created = Task::create(spec, 300, &DefaultClock)?;
    store.create_task(&created).await?;
    let task = store
        .update_task(
            created.id(),
            TaskChanges::new().with_branch_name(BranchName::new("feature/health-abc123")?),
        )
        .await?;

    let hosting = Arc::new(InMemoryGitHosting::new());
    hosting.accept_only("ghp_user");
    let service = PullRequestService::new(
        hosting.clone(),
        Arc::clone(&store),
        resolver,
        &GitHostingSettings::default(),
    )?;
    Ok(Harness {
        hosting,
        store,
        service,
        task,
    })
}

fn create_request() -> CreatePullRequest {
    CreatePullRequest {
        title: "Add health endpoint".to_owned(),
        body: "Adds `/health`.".to_owned(),
        base: None,
    }
}

impl Harness {
    async fn reload(&self) -> Result<Task> {
        self.store
            .snapshot(self.task.id())?
            .ok_or_else(|| eyre!("task vanished"))
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_records_open_pull_request() -> Result<()> {
    let harness = harness(true).await?;

    let record = harness.service.create(&harness.task, create_request()).await?;

    ensure!(record.status == PullRequestStatus::Open);
    ensure!(record.number.value() == 1);
    let stored = harness.reload().await?;
    ensure!(stored.pull_request() == Some(&record));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_token_is_a_configuration_error() -> Result<()> {
    let harness = harness(false).await?;

    let result = harness.service.create(&harness.task, create_request()).await;

    let Err(err) = result else {
        bail!("create should fail without a token");
    };
    ensure!(err.is_configuration());
    ensure!(matches!(
        err,
        PullRequestError::Credentials(CredentialError::MissingGitHostingToken)
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_create_is_rejected_while_open() -> Result<()> {
    let harness = harness(true).await?;
    harness.service.create(&harness.task, create_request()).await?;
    let task = harness.reload().await?;

    let result = harness.service.create(&task, create_request()).await;

    ensure!(matches!(result, Err(PullRequestError::AlreadyOpen { number: 1, .. })));
    Ok(())
}

#[rstest]
#[case(MergeMethod::Merge)]
#[case(MergeMethod::Squash)]
#[case(MergeMethod::Rebase)]
#[tokio::test(flavor = "multi_thread")]
async fn merge_records_commit(#[case] method: MergeMethod) -> Result<()> {
    let harness = harness(true).await?;
    harness.service.create(&harness.task, create_request()).await?;
    let task = harness.reload().await?;

    let record = harness
        .service
        .merge(
            &task,
            MergeRequest {
                method,
                commit_title: Some("Add health endpoint (#1)".to_owned()),
                commit_message: None,
            },
        )
        .await?;

    ensure!(record.status == PullRequestStatus::Merged);
    ensure!(record.merge_commit_sha.as_deref() == Some("merge-1"));
    let merges = harness.hosting.merges();
    ensure!(merges.first().is_some_and(|(_, request)| request.method == method));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn merge_conflict_is_normalised() -> Result<()> {
    let harness = harness(true).await?;
    harness.service.create(&harness.task, create_request()).await?;
    let task = harness.reload().await?;
    harness
        .hosting
        .fail_merges(GitHostingError::Conflict("head branch was modified".to_owned()));

    let result = harness.service.merge(&task, MergeRequest::default()).await;

    ensure!(matches!(
        result,
        Err(PullRequestError::Hosting(GitHostingError::Conflict(_)))
    ));
    ensure!(harness.reload().await?.pull_request().map(|pr| pr.status) == Some(PullRequestStatus::Open));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn close_then_reopen() -> Result<()> {
    let harness = harness(true).await?;
    harness.service.create(&harness.task, create_request()).await?;

    let closed = harness.service.close(&harness.reload().await?).await?;
    ensure!(closed.status == PullRequestStatus::Closed);

    let reopened = harness.service.reopen(&harness.reload().await?).await?;
    ensure!(reopened.status == PullRequestStatus::Open);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reopen_requires_closed_pull_request() -> Result<()> {
    let harness = harness(true).await?;
    harness.service.create(&harness.task, create_request()).await?;

    let result = harness.service.reopen(&harness.reload().await?).await;

    ensure!(matches!(
        result,
        Err(PullRequestError::NotOpen {
            status: PullRequestStatus::Open,
            ..
        })
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sync_status_picks_up_remote_merge() -> Result<()> {
    let harness = harness(true).await?;
    let opened = harness.service.create(&harness.task, create_request()).await?;
    let token = Secret::new("ghp_user").ok_or_else(|| eyre!("blank token"))?;
    crate::pull_request::ports::GitHostingApi::merge_pull_request(
        harness.hosting.as_ref(),
        &token,
        harness.task.repository(),
        opened.number.value(),
        &MergeRequest::default(),
    )
    .await?;

    let synced = harness.service.sync_status(&harness.reload().await?).await?;

    ensure!(synced.status == PullRequestStatus::Merged);
    ensure!(harness.reload().await?.pull_request() == Some(&synced));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn operations_without_pull_request_fail() -> Result<()> {
    let harness = harness(true).await?;

    let result = harness.service.close(&harness.task).await;

    ensure!(matches!(result, Err(PullRequestError::NoPullRequest(_))));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn preview_url_is_found_in_check_runs() -> Result<()> {
    let harness = harness(true).await?;
    harness
        .hosting
        .add_branch(harness.task.repository(), "feature/health-abc123", "sha-1");
    harness.hosting.add_check_run(
        "sha-1",
        CheckRun {
            name: "lint".to_owned(),
            ..CheckRun::default()
        },
    );
    harness.hosting.add_check_run(
        "sha-1",
        CheckRun {
            name: "Vercel".to_owned(),
            summary: Some("Preview: https://app-git-health-acme.vercel.app ready".to_owned()),
            ..CheckRun::default()
        },
    );

    let url = harness.service.discover_preview_url(&harness.task).await;

    ensure!(url.as_deref() == Some("https://app-git-health-acme.vercel.app"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn preview_discovery_failure_yields_none() -> Result<()> {
    let harness = harness(true).await?;

    let url = harness.service.discover_preview_url(&harness.task).await;

    ensure!(url.is_none(), "unknown branch should yield no preview");
    Ok(())
}

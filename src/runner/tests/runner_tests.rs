//! Tests for the task run state machine.

use crate::credentials::services::CredentialDefaults;
use crate::runner::{RunnerError, TaskSettings};
use crate::sandbox::domain::CommandOutput;
use crate::task::domain::{LogLevel, TaskStatus};
use eyre::{Result, bail, ensure};
use rstest::{fixture, rstest};

use super::support::{
    CLAUDE_OK, CountdownCancellation, Harness, RacingStop, StopBeforeBinding, full_defaults,
    sandbox_credentials,
};

#[fixture]
fn harness() -> Result<Harness> {
    Harness::configured()
}

fn script_changes(harness: &Harness) {
    harness
        .provider
        .script("claude -p", CommandOutput::success(CLAUDE_OK));
    harness
        .provider
        .script("git status --porcelain", CommandOutput::success(" M src/main.rs\n"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn successful_run_commits_pushes_and_releases_sandbox(
    harness: Result<Harness>,
) -> Result<()> {
    let harness = harness?;
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec).await?;

    let status = harness.runner.run(&task_id, &harness.owner).await?;

    ensure!(status == TaskStatus::Completed);
    let task = harness.task(&task_id)?;
    ensure!(task.status() == TaskStatus::Completed);
    ensure!(task.progress() == 100);
    ensure!(task.completed_at().is_some());
    ensure!(task.agent_session_id() == Some("sess-1"));
    let branch = task.branch_name().map(ToString::to_string).unwrap_or_default();
    ensure!(branch.starts_with("agent/2026-05-01T12-00-00-"), "branch {branch}");
    ensure!(harness.provider.ran("git commit -m"));
    ensure!(harness.provider.ran(&format!("git push -u origin {branch}")));
    ensure!(task.sandbox().is_none());
    ensure!(harness.provider.is_stopped("sbx-1"));
    ensure!(harness.runner.sandboxes().registry().is_empty());
    ensure!(task.logs().iter().any(|entry| entry.level == LogLevel::Success));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn run_without_changes_skips_commit(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    harness
        .provider
        .script("claude -p", CommandOutput::success(CLAUDE_OK));
    let task_id = harness.create_task(|spec| spec).await?;

    let status = harness.runner.run(&task_id, &harness.owner).await?;

    ensure!(status == TaskStatus::Completed);
    ensure!(!harness.provider.ran("git commit"));
    ensure!(!harness.provider.ran("git push"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn keep_alive_keeps_sandbox_registered(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec.with_keep_alive(true)).await?;

    harness.runner.run(&task_id, &harness.owner).await?;

    let task = harness.task(&task_id)?;
    ensure!(task.sandbox().map(|binding| binding.sandbox_id.as_str()) == Some("sbx-1"));
    ensure!(harness.runner.sandboxes().registry().contains(&task_id));
    ensure!(!harness.provider.is_stopped("sbx-1"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_api_key_fails_before_provisioning() -> Result<()> {
    let harness = Harness::new(CredentialDefaults {
        sandbox: sandbox_credentials()?,
        ..CredentialDefaults::default()
    })?;
    let task_id = harness.create_task(|spec| spec).await?;

    let status = harness.runner.run(&task_id, &harness.owner).await?;

    ensure!(status == TaskStatus::Error);
    let task = harness.task(&task_id)?;
    ensure!(task.error().is_some_and(|error| error.contains("ANTHROPIC_API_KEY")));
    ensure!(harness.provider.created().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn provisioning_is_retried_once(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    harness.provider.fail_next_creates(1);
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec).await?;

    let status = harness.runner.run(&task_id, &harness.owner).await?;

    ensure!(status == TaskStatus::Completed);
    ensure!(harness.provider.created().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn provisioning_failing_twice_errors_without_registry_entry(
    harness: Result<Harness>,
) -> Result<()> {
    let harness = harness?;
    harness.provider.fail_next_creates(2);
    let task_id = harness.create_task(|spec| spec.with_keep_alive(true)).await?;

    let status = harness.runner.run(&task_id, &harness.owner).await?;

    ensure!(status == TaskStatus::Error);
    let task = harness.task(&task_id)?;
    ensure!(task.sandbox().is_none());
    ensure!(task.error().is_some_and(|error| error.contains("provisioning failed")));
    ensure!(harness.runner.sandboxes().registry().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn provisioning_never_retries_more_than_once() -> Result<()> {
    let settings = TaskSettings {
        provision_attempts: 3,
        ..TaskSettings::default()
    };
    let harness = Harness::with_settings(full_defaults()?, settings)?;
    harness.provider.fail_next_creates(2);
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec).await?;

    let status = harness.runner.run(&task_id, &harness.owner).await?;

    ensure!(status == TaskStatus::Error);
    ensure!(harness.provider.created().is_empty());
    ensure!(!harness.provider.ran("claude -p"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancellation_before_agent_releases_keep_alive_sandbox(
    harness: Result<Harness>,
) -> Result<()> {
    let harness = harness?;
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec.with_keep_alive(true)).await?;

    let status = harness
        .runner
        .run_with_cancellation(&task_id, &harness.owner, &CountdownCancellation::new(2))
        .await?;

    ensure!(status == TaskStatus::Cancelled);
    ensure!(harness.task(&task_id)?.status() == TaskStatus::Cancelled);
    ensure!(!harness.provider.ran("claude -p"));
    ensure!(harness.provider.is_stopped("sbx-1"));
    ensure!(harness.task(&task_id)?.sandbox().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stop_racing_completion_is_reported_as_cancelled(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec).await?;
    let racing = RacingStop::new(harness.store.clone(), task_id.clone(), 3);

    let status = harness
        .runner
        .run_with_cancellation(&task_id, &harness.owner, &racing)
        .await?;

    ensure!(status == TaskStatus::Cancelled);
    let task = harness.task(&task_id)?;
    ensure!(task.status() == TaskStatus::Cancelled);
    ensure!(task.sandbox().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stop_racing_keep_alive_completion_releases_sandbox(
    harness: Result<Harness>,
) -> Result<()> {
    let harness = harness?;
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec.with_keep_alive(true)).await?;
    let racing = RacingStop::new(harness.store.clone(), task_id.clone(), 3);

    let status = harness
        .runner
        .run_with_cancellation(&task_id, &harness.owner, &racing)
        .await?;

    ensure!(status == TaskStatus::Cancelled, "returned {status}");
    let task = harness.task(&task_id)?;
    ensure!(task.status() == TaskStatus::Cancelled);
    ensure!(task.sandbox().is_none());
    ensure!(harness.runner.sandboxes().registry().is_empty());
    ensure!(harness.provider.is_stopped("sbx-1"));
    let last = task.logs().last().map(|entry| entry.message.as_str());
    ensure!(last == Some("Task cancelled"), "last log {last:?}");
    ensure!(
        task.logs()
            .iter()
            .all(|entry| entry.message != "Task completed")
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn binding_written_after_a_stop_is_cleared(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec).await?;
    let stop = StopBeforeBinding::new(
        harness.store.clone(),
        harness.runner.sandboxes(),
        task_id.clone(),
        2,
    );

    let status = harness
        .runner
        .run_with_cancellation(&task_id, &harness.owner, &stop)
        .await?;

    ensure!(status == TaskStatus::Cancelled);
    let task = harness.task(&task_id)?;
    ensure!(task.status() == TaskStatus::Cancelled);
    ensure!(task.sandbox().is_none(), "binding {:?}", task.sandbox());
    ensure!(harness.runner.sandboxes().registry().is_empty());
    ensure!(harness.provider.is_stopped("sbx-1"));
    ensure!(!harness.provider.ran("claude -p"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agent_failure_is_recorded_redacted(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    harness.provider.script(
        "claude -p",
        CommandOutput::failure(1, "invalid key sk-ant-test-key"),
    );
    let task_id = harness.create_task(|spec| spec).await?;

    let status = harness.runner.run(&task_id, &harness.owner).await?;

    ensure!(status == TaskStatus::Error);
    let task = harness.task(&task_id)?;
    ensure!(task.error() == Some("invalid key [REDACTED]"), "error {:?}", task.error());
    ensure!(
        task.logs()
            .iter()
            .all(|entry| !entry.message.contains("sk-ant-test-key"))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn install_failure_errors(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    harness
        .provider
        .script("ls -1A", CommandOutput::success("package.json\nsrc\n"));
    harness
        .provider
        .script("npm install", CommandOutput::failure(1, "ERESOLVE"));
    let task_id = harness
        .create_task(|spec| spec.with_install_dependencies(true))
        .await?;

    let status = harness.runner.run(&task_id, &harness.owner).await?;

    ensure!(status == TaskStatus::Error);
    ensure!(!harness.provider.ran("claude -p"));
    ensure!(
        harness
            .task(&task_id)?
            .error()
            .is_some_and(|error| error.starts_with("Dependency installation failed"))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_pending_tasks_run(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    harness
        .provider
        .script("claude -p", CommandOutput::success(CLAUDE_OK));
    let task_id = harness.create_task(|spec| spec).await?;
    harness.runner.run(&task_id, &harness.owner).await?;

    let result = harness.runner.run(&task_id, &harness.owner).await;

    let Err(RunnerError::NotPending { status, .. }) = result else {
        bail!("expected NotPending, got {result:?}");
    };
    ensure!(status == TaskStatus::Completed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn follow_up_resumes_session_and_keeps_status(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec.with_keep_alive(true)).await?;
    harness.runner.run(&task_id, &harness.owner).await?;

    let result = harness
        .runner
        .follow_up(&task_id, &harness.owner, "Also add a test")
        .await?;

    ensure!(result.success);
    ensure!(harness.provider.ran("--resume sess-1"));
    ensure!(harness.provider.ran("git commit -m 'Also add a test'"));
    ensure!(harness.task(&task_id)?.status() == TaskStatus::Completed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn follow_up_requires_keep_alive(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec).await?;
    harness.runner.run(&task_id, &harness.owner).await?;

    let result = harness
        .runner
        .follow_up(&task_id, &harness.owner, "Also add a test")
        .await;

    ensure!(matches!(result, Err(RunnerError::FollowUpUnavailable { .. })));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn follow_up_reports_stopped_sandbox(harness: Result<Harness>) -> Result<()> {
    let harness = harness?;
    script_changes(&harness);
    let task_id = harness.create_task(|spec| spec.with_keep_alive(true)).await?;
    harness.runner.run(&task_id, &harness.owner).await?;
    harness.runner.sandboxes().teardown(&task_id).await;

    let result = harness
        .runner
        .follow_up(&task_id, &harness.owner, "Also add a test")
        .await;

    ensure!(matches!(result, Err(RunnerError::SandboxUnavailable(_))));
    Ok(())
}

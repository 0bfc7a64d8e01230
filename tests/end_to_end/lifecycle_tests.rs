//! Task lifecycle scenarios driven through the control service and worker.

use super::helpers::{CLAUDE_OK, Engine, StopAtCheckpoint};
use eyre::{Result, ensure};
use foreman::agent::domain::AgentKind;
use foreman::runner::{DispatchError, RunRequest, TaskDispatcher, TaskWorker};
use foreman::sandbox::domain::CommandOutput;
use foreman::task::{
    domain::{LogLevel, TaskStatus},
    services::CreateTaskRequest,
};
use std::sync::Arc;

fn request() -> CreateTaskRequest {
    CreateTaskRequest::new(
        "Add a health endpoint\n\nReturn 200 with a JSON body.",
        "https://github.com/acme/app",
        AgentKind::Claude,
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn created_task_runs_to_completion_and_pushes() -> Result<()> {
    let engine = Engine::new()?;
    engine
        .provider
        .script("claude -p", CommandOutput::success(CLAUDE_OK));
    engine
        .provider
        .script("git status --porcelain", CommandOutput::success("?? src/health.rs\n"));
    let worker = TaskWorker::start(Arc::clone(&engine.runner), 8);
    let control = engine.control(Arc::new(worker.dispatcher()));

    let created = control.create(&engine.session, request()).await?;
    worker.shutdown().await;

    let task = engine.task(created.id())?;
    ensure!(task.status() == TaskStatus::Completed, "status {}", task.status());
    ensure!(task.progress() == 100);
    let branch = task.branch_name().map(ToString::to_string).unwrap_or_default();
    ensure!(branch.starts_with("agent/2026-07-01T08-00-00-"), "branch {branch}");
    ensure!(engine.provider.ran("git commit -m 'Add a health endpoint'"));
    ensure!(engine.provider.ran(&format!("git push -u origin {branch}")));
    ensure!(task.sandbox().is_none());
    ensure!(engine.provider.is_stopped("sbx-1"));
    ensure!(engine.sandboxes.registry().is_empty());
    ensure!(task.agent_session_id() == Some("sess-e2e"));
    let leaked = task
        .logs()
        .iter()
        .any(|entry| entry.message.contains("sk-ant-e2e-key"));
    ensure!(!leaked, "credential leaked into task logs");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_provisioning_failure_ends_in_error() -> Result<()> {
    let engine = Engine::new()?;
    engine.provider.fail_next_creates(2);
    let worker = TaskWorker::start(Arc::clone(&engine.runner), 8);
    let control = engine.control(Arc::new(worker.dispatcher()));

    let created = control.create(&engine.session, request()).await?;
    worker.shutdown().await;

    let task = engine.task(created.id())?;
    ensure!(task.status() == TaskStatus::Error);
    ensure!(task.error().is_some_and(|message| !message.is_empty()));
    ensure!(task.logs().iter().any(|entry| entry.level == LogLevel::Error));
    ensure!(task.sandbox().is_none());
    ensure!(engine.provider.created().is_empty());
    ensure!(engine.sandboxes.registry().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn user_stop_after_provisioning_skips_the_agent() -> Result<()> {
    let engine = Engine::new()?;
    engine
        .provider
        .script("claude -p", CommandOutput::success(CLAUDE_OK));
    let control = Arc::new(engine.control(Arc::new(ManualDispatch)));
    let created = control.create(&engine.session, request()).await?;
    let check = StopAtCheckpoint::new(&engine, Arc::clone(&control), created.id().clone(), 2);

    let status = engine
        .runner
        .run_with_cancellation(created.id(), &engine.owner, &check)
        .await?;

    ensure!(status == TaskStatus::Cancelled);
    let task = engine.task(created.id())?;
    ensure!(task.status() == TaskStatus::Cancelled);
    ensure!(!engine.provider.ran("claude -p"));
    ensure!(engine.provider.is_stopped("sbx-1"));
    ensure!(task.sandbox().is_none());
    ensure!(engine.sandboxes.registry().is_empty());
    Ok(())
}

/// Accepts run requests without executing them; the test drives the runner.
struct ManualDispatch;

#[async_trait::async_trait]
impl TaskDispatcher for ManualDispatch {
    async fn dispatch(&self, _request: RunRequest) -> Result<(), DispatchError> {
        Ok(())
    }
}

//! Tests for the background worker.

use crate::runner::{DispatchError, RunRequest, TaskDispatcher, TaskWorker};
use crate::sandbox::domain::CommandOutput;
use crate::task::domain::TaskStatus;
use eyre::{Result, ensure};

use super::support::{CLAUDE_OK, Harness};

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_drains_in_flight_runs() -> Result<()> {
    let harness = Harness::configured()?;
    harness
        .provider
        .script("claude -p", CommandOutput::success(CLAUDE_OK));
    let first = harness.create_task(|spec| spec).await?;
    let second = harness.create_task(|spec| spec).await?;
    let worker = TaskWorker::start(harness.runner.clone(), 4);
    let dispatcher = worker.dispatcher();

    dispatcher
        .dispatch(RunRequest::initial(first.clone(), harness.owner.clone()))
        .await?;
    dispatcher
        .dispatch(RunRequest::initial(second.clone(), harness.owner.clone()))
        .await?;
    worker.shutdown().await;

    ensure!(harness.task(&first)?.status() == TaskStatus::Completed);
    ensure!(harness.task(&second)?.status() == TaskStatus::Completed);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatch_after_shutdown_is_rejected() -> Result<()> {
    let harness = Harness::configured()?;
    let worker = TaskWorker::start(harness.runner.clone(), 1);
    let dispatcher = worker.dispatcher();
    worker.shutdown().await;

    let task_id = harness.create_task(|spec| spec).await?;
    let result = dispatcher
        .dispatch(RunRequest::initial(task_id, harness.owner.clone()))
        .await;

    ensure!(matches!(result, Err(DispatchError::Closed)));
    Ok(())
}

//! Tests for store-backed cancellation.

use crate::agent::ports::CancellationCheck;
use crate::runner::StoredCancellation;
use crate::task::domain::{TaskChanges, TaskStatus};
use crate::task::ports::TaskStore;
use eyre::{Result, ensure};

use super::support::Harness;

#[tokio::test(flavor = "multi_thread")]
async fn reports_cancelled_once_store_holds_it() -> Result<()> {
    let harness = Harness::configured()?;
    let task_id = harness.create_task(|spec| spec).await?;
    let check = StoredCancellation::new(harness.store.clone(), task_id.clone(), harness.owner.clone());
    ensure!(!check.is_cancelled().await);

    harness
        .store
        .update_task(&task_id, TaskChanges::new().with_status(TaskStatus::Processing))
        .await?;
    harness
        .store
        .update_task(&task_id, TaskChanges::new().with_status(TaskStatus::Cancelled))
        .await?;

    ensure!(check.is_cancelled().await);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn deleted_task_counts_as_cancelled() -> Result<()> {
    let harness = Harness::configured()?;
    let task_id = harness.create_task(|spec| spec).await?;
    let check = StoredCancellation::new(harness.store.clone(), task_id.clone(), harness.owner.clone());

    harness
        .store
        .update_task(&task_id, TaskChanges::new().deleted())
        .await?;

    ensure!(check.is_cancelled().await);
    Ok(())
}

//! Cooperative cancellation checks.

use async_trait::async_trait;

/// Reports whether the current run should stop at the next checkpoint.
#[async_trait]
pub trait CancellationCheck: Send + Sync {
    /// Returns `true` once the run has been cancelled.
    async fn is_cancelled(&self) -> bool;
}

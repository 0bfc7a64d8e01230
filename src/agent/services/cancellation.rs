//! In-process cancellation flag.

use crate::agent::ports::CancellationCheck;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation signalled from inside the process.
#[derive(Debug, Default)]
pub struct CancellationFlag {
    cancelled: AtomicBool,
}

impl CancellationFlag {
    /// Creates an unset flag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Marks the run as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CancellationCheck for CancellationFlag {
    async fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

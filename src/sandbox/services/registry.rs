//! In-process registry of live sandboxes.

use super::SandboxHandle;
use crate::task::domain::TaskId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Concurrency-safe map from task identifiers to live sandbox handles.
///
/// Entries are only valid within the process that registered them. After a
/// restart, or on another instance, a handle is recovered through
/// [`super::SandboxManager::resolve`] using the sandbox id recorded on the
/// task; horizontal scaling therefore needs sticky routing per task or a
/// shared registry keyed by task id.
#[derive(Debug, Default)]
pub struct SandboxRegistry {
    entries: RwLock<HashMap<TaskId, SandboxHandle>>,
}

impl SandboxRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` for its task, returning any handle it displaced.
    pub fn register(&self, handle: SandboxHandle) -> Option<SandboxHandle> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(handle.task_id().clone(), handle)
    }

    /// Removes the entry for `task_id`. Removing an absent entry is a no-op.
    pub fn unregister(&self, task_id: &TaskId) -> Option<SandboxHandle> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.remove(task_id)
    }

    /// Returns the handle registered for `task_id`.
    #[must_use]
    pub fn get(&self, task_id: &TaskId) -> Option<SandboxHandle> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(task_id).cloned()
    }

    /// Returns `true` when `task_id` has a registered handle.
    #[must_use]
    pub fn contains(&self, task_id: &TaskId) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(task_id)
    }

    /// Returns the number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    /// Returns `true` when no handle is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

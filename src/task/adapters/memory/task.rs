//! In-memory task store for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{
        LogEntry, MessageId, MessageRole, Task, TaskChanges, TaskId, TaskMessage, UserId,
    },
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};

/// Thread-safe in-memory task store.
///
/// Every write holds the state lock for its whole duration, so each
/// [`TaskChanges`] value is applied atomically.
#[derive(Debug, Clone)]
pub struct InMemoryTaskStore<C = DefaultClock>
where
    C: Clock + Send + Sync,
{
    state: Arc<RwLock<InMemoryTaskState>>,
    clock: Arc<C>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    messages: Vec<TaskMessage>,
}

impl InMemoryTaskStore<DefaultClock> {
    /// Creates an empty store stamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl Default for InMemoryTaskStore<DefaultClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> InMemoryTaskStore<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty store stamped by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryTaskState::default())),
            clock,
        }
    }

    /// Returns a task regardless of owner or deletion state.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] when the lock is poisoned.
    pub fn snapshot(&self, id: &TaskId) -> TaskStoreResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.tasks.get(id).cloned())
    }

    fn read(&self) -> TaskStoreResult<std::sync::RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state
            .read()
            .map_err(|err| TaskStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> TaskStoreResult<std::sync::RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state
            .write()
            .map_err(|err| TaskStoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

fn saturating_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[async_trait]
impl<C> TaskStore for InMemoryTaskStore<C>
where
    C: Clock + Send + Sync,
{
    async fn create_task(&self, task: &Task) -> TaskStoreResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(task.id()) {
            return Err(TaskStoreError::DuplicateTask(task.id().clone()));
        }
        state.tasks.insert(task.id().clone(), task.clone());
        Ok(())
    }

    async fn get_task(&self, id: &TaskId, owner: &UserId) -> TaskStoreResult<Option<Task>> {
        let state = self.read()?;
        Ok(state
            .tasks
            .get(id)
            .filter(|task| task.user_id() == owner && !task.is_deleted())
            .cloned())
    }

    async fn update_task(&self, id: &TaskId, changes: TaskChanges) -> TaskStoreResult<Task> {
        let mut state = self.write()?;
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskStoreError::NotFound(id.clone()))?;
        task.apply_changes(changes, &*self.clock)?;
        Ok(task.clone())
    }

    async fn append_log_entries(
        &self,
        id: &TaskId,
        entries: Vec<LogEntry>,
    ) -> TaskStoreResult<()> {
        let mut state = self.write()?;
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskStoreError::NotFound(id.clone()))?;
        task.append_logs(entries, &*self.clock);
        Ok(())
    }

    async fn list_tasks_for_user(&self, owner: &UserId) -> TaskStoreResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.user_id() == owner && !task.is_deleted())
            .cloned()
            .collect();
        tasks.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(tasks)
    }

    async fn create_message(&self, message: &TaskMessage) -> TaskStoreResult<()> {
        let mut state = self.write()?;
        if !state.tasks.contains_key(message.task_id()) {
            return Err(TaskStoreError::NotFound(message.task_id().clone()));
        }
        state.messages.push(message.clone());
        Ok(())
    }

    async fn update_message_content(&self, id: MessageId, content: &str) -> TaskStoreResult<()> {
        let mut state = self.write()?;
        let message = state
            .messages
            .iter_mut()
            .find(|message| message.id() == id)
            .ok_or(TaskStoreError::MessageNotFound(id))?;
        message.replace_content(content, &*self.clock);
        Ok(())
    }

    async fn list_messages(&self, task_id: &TaskId) -> TaskStoreResult<Vec<TaskMessage>> {
        let state = self.read()?;
        Ok(state
            .messages
            .iter()
            .filter(|message| message.task_id() == task_id)
            .cloned()
            .collect())
    }

    async fn count_tasks_created_since(
        &self,
        owner: &UserId,
        since: DateTime<Utc>,
    ) -> TaskStoreResult<u32> {
        let state = self.read()?;
        let count = state
            .tasks
            .values()
            .filter(|task| task.user_id() == owner && task.created_at() >= since)
            .count();
        Ok(saturating_count(count))
    }

    async fn count_user_messages_since(
        &self,
        owner: &UserId,
        since: DateTime<Utc>,
    ) -> TaskStoreResult<u32> {
        let state = self.read()?;
        let count = state
            .messages
            .iter()
            .filter(|message| message.role() == MessageRole::User)
            .filter(|message| message.created_at() >= since)
            .filter(|message| {
                state
                    .tasks
                    .get(message.task_id())
                    .is_some_and(|task| task.user_id() == owner)
            })
            .count();
        Ok(saturating_count(count))
    }
}

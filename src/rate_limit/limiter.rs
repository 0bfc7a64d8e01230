//! Quota evaluation against the task store.

use super::RateLimitSettings;
use crate::task::{
    domain::UserId,
    ports::{TaskStore, TaskStoreError},
};
use chrono::{DateTime, Days, NaiveTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Whether another request may be accepted.
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Limit for the current window.
    pub total: u32,
    /// Start of the next window.
    pub reset_at: DateTime<Utc>,
}

/// Errors raised while evaluating a quota.
#[derive(Debug, Clone, Error)]
pub enum RateLimitError {
    /// Usage could not be counted.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

/// Counts a user's requests in the current UTC day.
pub struct RateLimiter<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    settings: RateLimitSettings,
}

impl<S, C> RateLimiter<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a limiter.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, settings: RateLimitSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    /// Evaluates the quota for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Store`] when usage cannot be counted.
    pub async fn check(&self, user: &UserId) -> Result<RateLimitStatus, RateLimitError> {
        let now = self.clock.utc();
        let window_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let reset_at = window_start
            .checked_add_days(Days::new(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let tasks = self.store.count_tasks_created_since(user, window_start).await?;
        let messages = self.store.count_user_messages_since(user, window_start).await?;
        let used = tasks.saturating_add(messages);
        let total = self.settings.limit_for(user);
        let status = RateLimitStatus {
            allowed: used < total,
            remaining: total.saturating_sub(used),
            total,
            reset_at,
        };
        debug!(user_id = %user, used, total, allowed = status.allowed, "rate limit checked");
        Ok(status)
    }
}

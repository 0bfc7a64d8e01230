//! Tests for daily quota evaluation.

use std::sync::Arc;

use crate::agent::domain::AgentKind;
use crate::rate_limit::{RateLimitSettings, RateLimiter};
use crate::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{MessageRole, Task, TaskChanges, TaskMessage, TaskSpec, UserId},
    ports::TaskStore,
};
use crate::test_support::ManualClock;
use chrono::{TimeDelta, TimeZone, Utc};
use eyre::Result;
use rstest::{fixture, rstest};
use std::collections::BTreeMap;

struct Harness {
    clock: Arc<ManualClock>,
    store: Arc<InMemoryTaskStore<ManualClock>>,
}

impl Harness {
    fn limiter(&self, settings: RateLimitSettings) -> RateLimiter<InMemoryTaskStore<ManualClock>, ManualClock> {
        RateLimiter::new(Arc::clone(&self.store), Arc::clone(&self.clock), settings)
    }

    async fn create_task(&self, user: &UserId) -> Result<Task> {
        let spec = TaskSpec::new(
            user.clone(),
            "add a health endpoint",
            "https://github.com/acme/app",
            AgentKind::Claude,
        );
        let task = Task::create(spec, 300, &*self.clock)?;
        self.store.create_task(&task).await?;
        Ok(task)
    }
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(ManualClock::at(2026, 3, 14, 9, 30));
    let store = Arc::new(InMemoryTaskStore::with_clock(Arc::clone(&clock)));
    Harness { clock, store }
}

fn limit(daily_limit: u32) -> RateLimitSettings {
    RateLimitSettings {
        daily_limit,
        overrides: BTreeMap::new(),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fresh_user_has_full_quota(harness: Harness) -> Result<()> {
    let status = harness.limiter(limit(5)).check(&UserId::new("user-1")?).await?;

    assert!(status.allowed);
    assert_eq!(status.remaining, 5);
    assert_eq!(status.total, 5);
    let midnight = Utc
        .with_ymd_and_hms(2026, 3, 15, 0, 0, 0)
        .single()
        .ok_or_else(|| eyre::eyre!("invalid date"))?;
    assert_eq!(status.reset_at, midnight);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_and_user_messages_share_the_quota(harness: Harness) -> Result<()> {
    let user = UserId::new("user-1")?;
    let task = harness.create_task(&user).await?;
    harness.create_task(&user).await?;
    let follow_up = TaskMessage::new(
        task.id().clone(),
        MessageRole::User,
        "also add tests",
        &*harness.clock,
    );
    harness.store.create_message(&follow_up).await?;
    let reply = TaskMessage::new(task.id().clone(), MessageRole::Agent, "done", &*harness.clock);
    harness.store.create_message(&reply).await?;

    let status = harness.limiter(limit(3)).check(&user).await?;

    assert!(!status.allowed);
    assert_eq!(status.remaining, 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleted_tasks_still_count(harness: Harness) -> Result<()> {
    let user = UserId::new("user-1")?;
    let task = harness.create_task(&user).await?;
    harness
        .store
        .update_task(task.id(), TaskChanges::new().deleted())
        .await?;

    let status = harness.limiter(limit(2)).check(&user).await?;

    assert_eq!(status.remaining, 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn window_resets_at_utc_midnight(harness: Harness) -> Result<()> {
    let user = UserId::new("user-1")?;
    harness.create_task(&user).await?;
    let limiter = harness.limiter(limit(1));
    assert!(!limiter.check(&user).await?.allowed);

    harness.clock.advance(TimeDelta::hours(15));

    let status = limiter.check(&user).await?;
    assert!(status.allowed);
    assert_eq!(status.remaining, 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn other_users_do_not_consume_quota(harness: Harness) -> Result<()> {
    harness.create_task(&UserId::new("user-2")?).await?;

    let status = harness.limiter(limit(1)).check(&UserId::new("user-1")?).await?;

    assert!(status.allowed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn per_user_override_replaces_default(harness: Harness) -> Result<()> {
    let user = UserId::new("power-user")?;
    harness.create_task(&user).await?;
    let mut settings = limit(1);
    settings.overrides.insert("power-user".to_owned(), 10);

    let status = harness.limiter(settings).check(&user).await?;

    assert!(status.allowed);
    assert_eq!(status.total, 10);
    assert_eq!(status.remaining, 9);
    Ok(())
}

//! Runner test harness.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::agent::{domain::AgentKind, ports::CancellationCheck, services::AgentCatalog};
use crate::credentials::{
    adapters::memory::InMemoryCredentialStore,
    domain::{ApiProvider, SandboxCredentials, Secret},
    services::{CredentialDefaults, CredentialResolver},
};
use crate::naming::services::BranchNamer;
use crate::runner::{TaskRunner, TaskSettings};
use crate::sandbox::{
    adapters::memory::InMemorySandboxProvider,
    services::{SandboxManager, SandboxRegistry, SandboxSettings},
};
use crate::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{Task, TaskChanges, TaskId, TaskSpec, TaskStatus, UserId},
    ports::TaskStore,
};
use crate::test_support::ManualClock;
use async_trait::async_trait;
use eyre::{Result, eyre};

pub(super) type TestStore = InMemoryTaskStore<ManualClock>;
pub(super) type TestRunner = TaskRunner<TestStore, InMemorySandboxProvider, ManualClock>;
pub(super) type TestSandboxes = SandboxManager<InMemorySandboxProvider>;

pub(super) const CLAUDE_OK: &str =
    r#"{"type":"result","is_error":false,"result":"Added /health","session_id":"sess-1"}"#;

pub(super) struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<TestStore>,
    pub provider: Arc<InMemorySandboxProvider>,
    pub runner: Arc<TestRunner>,
    pub owner: UserId,
}

impl Harness {
    pub fn new(defaults: CredentialDefaults) -> Result<Self> {
        Self::with_settings(defaults, TaskSettings::default())
    }

    pub fn with_settings(defaults: CredentialDefaults, settings: TaskSettings) -> Result<Self> {
        let clock = Arc::new(ManualClock::at(2026, 5, 1, 12, 0));
        let store = Arc::new(InMemoryTaskStore::with_clock(Arc::clone(&clock)));
        let provider = Arc::new(InMemorySandboxProvider::new());
        let sandboxes = Arc::new(SandboxManager::new(
            Arc::clone(&provider),
            Arc::new(SandboxRegistry::new()),
            SandboxSettings::default(),
        ));
        let resolver = CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(defaults),
        );
        let runner = Arc::new(TaskRunner::new(
            Arc::clone(&store),
            sandboxes,
            Arc::new(AgentCatalog::with_defaults()),
            resolver,
            BranchNamer::fallback_only(),
            Arc::clone(&clock),
            settings,
        ));
        Ok(Self {
            clock,
            store,
            provider,
            runner,
            owner: UserId::new("user-1")?,
        })
    }

    pub fn configured() -> Result<Self> {
        Self::new(full_defaults()?)
    }

    pub async fn create_task(&self, configure: impl FnOnce(TaskSpec) -> TaskSpec) -> Result<TaskId> {
        let spec = configure(TaskSpec::new(
            self.owner.clone(),
            "Add a health endpoint",
            "https://github.com/acme/app",
            AgentKind::Claude,
        ));
        let task = Task::create(spec, 300, &*self.clock)?;
        self.store.create_task(&task).await?;
        Ok(task.id().clone())
    }

    pub fn task(&self, id: &TaskId) -> Result<Task> {
        self.store
            .snapshot(id)?
            .ok_or_else(|| eyre!("task {id} missing"))
    }
}

pub(super) fn secret(value: &str) -> Result<Secret> {
    Secret::new(value).ok_or_else(|| eyre!("blank secret"))
}

pub(super) fn sandbox_credentials() -> Result<SandboxCredentials> {
    Ok(SandboxCredentials {
        token: Some(secret("vercel-token")?),
        team_id: Some("team_1".to_owned()),
        project_id: Some("prj_1".to_owned()),
    })
}

pub(super) fn full_defaults() -> Result<CredentialDefaults> {
    let mut defaults = CredentialDefaults {
        sandbox: sandbox_credentials()?,
        git_hosting_token: Some(secret("ghp_defaulttoken1234567890")?),
        ..CredentialDefaults::default()
    };
    defaults
        .api_keys
        .insert(ApiProvider::Anthropic, secret("sk-ant-test-key")?);
    Ok(defaults)
}

/// Reports cancellation from the `cancel_on`-th check onwards.
pub(super) struct CountdownCancellation {
    calls: AtomicU32,
    cancel_on: u32,
}

impl CountdownCancellation {
    pub const fn new(cancel_on: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            cancel_on,
        }
    }
}

#[async_trait]
impl CancellationCheck for CountdownCancellation {
    async fn is_cancelled(&self) -> bool {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        call >= self.cancel_on
    }
}

/// Stops the task in the store on the `stop_on`-th check but never reports
/// cancellation itself, as a user stop racing a running agent would.
pub(super) struct RacingStop {
    store: Arc<TestStore>,
    task_id: TaskId,
    calls: AtomicU32,
    stop_on: u32,
}

impl RacingStop {
    pub const fn new(store: Arc<TestStore>, task_id: TaskId, stop_on: u32) -> Self {
        Self {
            store,
            task_id,
            calls: AtomicU32::new(0),
            stop_on,
        }
    }
}

#[async_trait]
impl CancellationCheck for RacingStop {
    async fn is_cancelled(&self) -> bool {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.stop_on {
            let stopped = self
                .store
                .update_task(
                    &self.task_id,
                    TaskChanges::new().with_status(TaskStatus::Cancelled),
                )
                .await;
            assert!(stopped.is_ok(), "stop failed: {stopped:?}");
        }
        false
    }
}

/// Replays a user stop that lands between sandbox registration and the
/// runner persisting the binding.
///
/// On the `stop_on`-th check the stop cancels the task, clears its binding
/// and tears down the registry entry. The runner's binding write then
/// lands on the cancelled task.
pub(super) struct StopBeforeBinding {
    store: Arc<TestStore>,
    sandboxes: Arc<TestSandboxes>,
    task_id: TaskId,
    calls: AtomicU32,
    stop_on: u32,
}

impl StopBeforeBinding {
    pub fn new(
        store: Arc<TestStore>,
        sandboxes: &Arc<TestSandboxes>,
        task_id: TaskId,
        stop_on: u32,
    ) -> Self {
        Self {
            store,
            sandboxes: Arc::clone(sandboxes),
            task_id,
            calls: AtomicU32::new(0),
            stop_on,
        }
    }
}

#[async_trait]
impl CancellationCheck for StopBeforeBinding {
    async fn is_cancelled(&self) -> bool {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call < self.stop_on {
            return false;
        }
        if call > self.stop_on {
            return true;
        }
        let binding = self
            .store
            .snapshot(&self.task_id)
            .ok()
            .flatten()
            .and_then(|task| task.sandbox().cloned());
        assert!(binding.is_some(), "task has no binding to replay");
        let stopped = self
            .store
            .update_task(
                &self.task_id,
                TaskChanges::new()
                    .with_status(TaskStatus::Cancelled)
                    .clear_sandbox(),
            )
            .await;
        assert!(stopped.is_ok(), "stop failed: {stopped:?}");
        self.sandboxes.teardown(&self.task_id).await;
        if let Some(stale) = binding {
            let rebound = self
                .store
                .update_task(&self.task_id, TaskChanges::new().with_sandbox(stale))
                .await;
            assert!(rebound.is_ok(), "late binding write failed: {rebound:?}");
        }
        true
    }
}

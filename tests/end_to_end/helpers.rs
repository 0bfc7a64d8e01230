//! Shared wiring for end-to-end tests.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use eyre::{Result, eyre};
use foreman::agent::{ports::CancellationCheck, services::AgentCatalog};
use foreman::credentials::{
    adapters::memory::InMemoryCredentialStore,
    domain::{ApiProvider, SandboxCredentials, Secret},
    services::{CredentialDefaults, CredentialResolver},
};
use foreman::naming::services::BranchNamer;
use foreman::rate_limit::{RateLimitSettings, RateLimiter};
use foreman::runner::{StoredCancellation, TaskDispatcher, TaskRunner, TaskSettings};
use foreman::sandbox::{
    adapters::memory::InMemorySandboxProvider,
    services::{SandboxManager, SandboxRegistry, SandboxSettings},
};
use foreman::task::{
    adapters::memory::{InMemoryTaskStore, StaticSession},
    domain::{Task, TaskId, UserId},
    services::TaskControlService,
};
use mockable::Clock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Store type used by every scenario.
pub type Store = InMemoryTaskStore<FixedClock>;
/// Runner type used by every scenario.
pub type Runner = TaskRunner<Store, InMemorySandboxProvider, FixedClock>;
/// Control service type used by every scenario.
pub type Control = TaskControlService<Store, InMemorySandboxProvider, FixedClock>;

/// Claude CLI output for a successful turn.
pub const CLAUDE_OK: &str =
    r#"{"type":"result","is_error":false,"result":"Added /health","session_id":"sess-e2e"}"#;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Starts at 2026-07-01 08:00 UTC.
    pub fn new() -> Self {
        let now = Utc
            .with_ymd_and_hms(2026, 7, 1, 8, 0, 0)
            .single()
            .unwrap_or_default();
        Self {
            now: Mutex::new(now),
        }
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fully wired engine over in-memory adapters.
pub struct Engine {
    /// Shared clock.
    pub clock: Arc<FixedClock>,
    /// Task store.
    pub store: Arc<Store>,
    /// Scriptable sandbox provider.
    pub provider: Arc<InMemorySandboxProvider>,
    /// Sandbox manager shared by runner and control service.
    pub sandboxes: Arc<SandboxManager<InMemorySandboxProvider>>,
    /// Task runner.
    pub runner: Arc<Runner>,
    /// Authenticated session.
    pub session: StaticSession,
    /// Owner of every task.
    pub owner: UserId,
}

impl Engine {
    /// Wires the engine with sandbox and Anthropic credentials configured.
    pub fn new() -> Result<Self> {
        let clock = Arc::new(FixedClock::new());
        let store = Arc::new(InMemoryTaskStore::with_clock(Arc::clone(&clock)));
        let provider = Arc::new(InMemorySandboxProvider::new());
        let sandboxes = Arc::new(SandboxManager::new(
            Arc::clone(&provider),
            Arc::new(SandboxRegistry::new()),
            SandboxSettings::default(),
        ));
        let resolver = CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(defaults()?),
        );
        let runner = Arc::new(TaskRunner::new(
            Arc::clone(&store),
            Arc::clone(&sandboxes),
            Arc::new(AgentCatalog::with_defaults()),
            resolver,
            BranchNamer::fallback_only(),
            Arc::clone(&clock),
            TaskSettings::default(),
        ));
        let owner = UserId::new("e2e-user")?;
        Ok(Self {
            clock,
            store,
            provider,
            sandboxes,
            runner,
            session: StaticSession::authenticated(owner.clone()),
            owner,
        })
    }

    /// Builds a control service that queues runs on `dispatcher`.
    pub fn control(&self, dispatcher: Arc<dyn TaskDispatcher>) -> Control {
        TaskControlService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sandboxes),
            RateLimiter::new(
                Arc::clone(&self.store),
                Arc::clone(&self.clock),
                RateLimitSettings::default(),
            ),
            dispatcher,
            Arc::clone(&self.clock),
            TaskSettings::default(),
        )
    }

    /// Reads a task regardless of owner or deletion.
    pub fn task(&self, id: &TaskId) -> Result<Task> {
        self.store
            .snapshot(id)?
            .ok_or_else(|| eyre!("task {id} missing"))
    }
}

fn secret(value: &str) -> Result<Secret> {
    Secret::new(value).ok_or_else(|| eyre!("blank secret"))
}

fn defaults() -> Result<CredentialDefaults> {
    let mut defaults = CredentialDefaults {
        sandbox: SandboxCredentials {
            token: Some(secret("sandbox-token")?),
            team_id: Some("team_e2e".to_owned()),
            project_id: Some("prj_e2e".to_owned()),
        },
        git_hosting_token: Some(secret("ghp_e2etoken000000000000")?),
        ..CredentialDefaults::default()
    };
    defaults
        .api_keys
        .insert(ApiProvider::Anthropic, secret("sk-ant-e2e-key")?);
    Ok(defaults)
}

/// Stops the task through the control service on the `stop_on`-th
/// checkpoint, then reports what the store holds.
pub struct StopAtCheckpoint {
    control: Arc<Control>,
    session: StaticSession,
    task_id: TaskId,
    stored: StoredCancellation<Store>,
    calls: AtomicU32,
    stop_on: u32,
}

impl StopAtCheckpoint {
    /// Creates the check for `task_id`.
    pub fn new(engine: &Engine, control: Arc<Control>, task_id: TaskId, stop_on: u32) -> Self {
        Self {
            control,
            session: engine.session.clone(),
            stored: StoredCancellation::new(
                Arc::clone(&engine.store),
                task_id.clone(),
                engine.owner.clone(),
            ),
            task_id,
            calls: AtomicU32::new(0),
            stop_on,
        }
    }
}

#[async_trait]
impl CancellationCheck for StopAtCheckpoint {
    async fn is_cancelled(&self) -> bool {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.stop_on {
            let stopped = self.control.stop(&self.session, &self.task_id).await;
            assert!(stopped.is_ok(), "stop failed: {stopped:?}");
        }
        self.stored.is_cancelled().await
    }
}

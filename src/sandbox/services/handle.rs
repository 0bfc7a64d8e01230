//! Live sandbox handles and scoped credential injection.

use crate::sandbox::{
    domain::{CommandOutput, CommandRequest, RemoteSandbox},
    ports::{SandboxProvider, SandboxProviderResult},
};
use crate::task::domain::{SandboxBinding, TaskId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

/// A live sandbox bound to one task.
///
/// Handles are cheap to clone and share their environment map and
/// execution lock. Commands run with the handle's environment; the process
/// environment of the engine is never read or written.
#[derive(Clone)]
pub struct SandboxHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    task_id: TaskId,
    remote: RemoteSandbox,
    url: String,
    provider: Arc<dyn SandboxProvider>,
    env: Mutex<BTreeMap<String, String>>,
    exec_lock: AsyncMutex<()>,
}

impl SandboxHandle {
    /// Creates a handle for a provider sandbox.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        remote: RemoteSandbox,
        url: impl Into<String>,
        provider: Arc<dyn SandboxProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                task_id,
                remote,
                url: url.into(),
                provider,
                env: Mutex::new(BTreeMap::new()),
                exec_lock: AsyncMutex::new(()),
            }),
        }
    }

    /// Returns the owning task.
    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.inner.task_id
    }

    /// Returns the provider sandbox identifier.
    #[must_use]
    pub fn sandbox_id(&self) -> &str {
        &self.inner.remote.sandbox_id
    }

    /// Returns the repository working directory.
    #[must_use]
    pub fn workdir(&self) -> &str {
        &self.inner.remote.workdir
    }

    /// Returns the externally reachable URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns the provider identity of the sandbox.
    #[must_use]
    pub fn remote(&self) -> &RemoteSandbox {
        &self.inner.remote
    }

    /// Returns the durable binding recorded on the task.
    #[must_use]
    pub fn binding(&self) -> SandboxBinding {
        SandboxBinding {
            sandbox_id: self.sandbox_id().to_owned(),
            sandbox_url: self.url().to_owned(),
        }
    }

    /// Returns a copy of the handle's environment.
    #[must_use]
    pub fn environment(&self) -> BTreeMap<String, String> {
        self.inner
            .env
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns `true` when both handles share the same state.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs a command under the execution lock.
    ///
    /// Waits for any active [`CredentialScope`] to finish first, so
    /// commands outside a scope never observe injected credentials.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the command could not be executed.
    pub async fn run(&self, request: CommandRequest) -> SandboxProviderResult<CommandOutput> {
        let _exec = self.inner.exec_lock.lock().await;
        self.dispatch(request).await
    }

    /// Injects `variables` into the handle's environment until the returned
    /// scope is dropped.
    ///
    /// The scope holds the execution lock, so injections on one handle are
    /// serialised, and the prior environment is restored on every exit path.
    pub async fn scope_credentials(
        &self,
        variables: BTreeMap<String, String>,
    ) -> CredentialScope<'_> {
        let exec = self.inner.exec_lock.lock().await;
        let snapshot = {
            let mut env = self.inner.env.lock().unwrap_or_else(PoisonError::into_inner);
            let snapshot = env.clone();
            env.extend(variables);
            snapshot
        };
        CredentialScope {
            handle: self,
            snapshot,
            _exec: exec,
        }
    }

    /// Stops the sandbox through the provider.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the stop call fails.
    pub async fn stop(&self) -> SandboxProviderResult<()> {
        self.inner.provider.stop(&self.inner.remote).await
    }

    async fn dispatch(&self, request: CommandRequest) -> SandboxProviderResult<CommandOutput> {
        let env = self.environment();
        let prepared = request
            .with_base_env(&env)
            .with_default_cwd(self.workdir());
        self.inner
            .provider
            .run_command(&self.inner.remote, &prepared)
            .await
    }
}

impl fmt::Debug for SandboxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SandboxHandle")
            .field("task_id", &self.inner.task_id)
            .field("sandbox_id", &self.inner.remote.sandbox_id)
            .field("url", &self.inner.url)
            .finish_non_exhaustive()
    }
}

/// Credentials injected into one sandbox handle.
///
/// Dropping the scope restores the environment captured when it was
/// created and releases the execution lock.
pub struct CredentialScope<'a> {
    handle: &'a SandboxHandle,
    snapshot: BTreeMap<String, String>,
    _exec: AsyncMutexGuard<'a, ()>,
}

impl CredentialScope<'_> {
    /// Runs a command with the injected credentials.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the command could not be executed.
    pub async fn run(&self, request: CommandRequest) -> SandboxProviderResult<CommandOutput> {
        self.handle.dispatch(request).await
    }

    /// Returns the scoped handle.
    #[must_use]
    pub const fn handle(&self) -> &SandboxHandle {
        self.handle
    }
}

impl Drop for CredentialScope<'_> {
    fn drop(&mut self) {
        let mut env = self
            .handle
            .inner
            .env
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *env = std::mem::take(&mut self.snapshot);
    }
}

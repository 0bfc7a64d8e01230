//! Sandbox provisioning, reconnection and teardown.

use super::{SandboxHandle, SandboxRegistry, git};
use crate::credentials::domain::ResolvedCredentials;
use crate::sandbox::{
    domain::{CommandRequest, PackageManager, RemoteSandbox, ResourceSpec, SandboxError, SandboxSpec},
    ports::SandboxProvider,
};
use crate::task::domain::{BranchName, TaskId};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Sandbox defaults applied to every provisioning request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Sandbox lifetime in minutes.
    pub timeout_minutes: u32,
    /// Ports exposed by the sandbox. The first one provides the task URL.
    pub ports: Vec<u16>,
    /// Compute resources.
    pub resources: ResourceSpec,
    /// Commit author name.
    pub git_user_name: String,
    /// Commit author email.
    pub git_user_email: String,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            timeout_minutes: 60,
            ports: vec![3000],
            resources: ResourceSpec::default(),
            git_user_name: "Foreman Agent".to_owned(),
            git_user_email: "agent@foreman.invalid".to_owned(),
        }
    }
}

/// Inputs for provisioning one task sandbox.
#[derive(Debug, Clone, Copy)]
pub struct ProvisionRequest<'a> {
    /// Task the sandbox serves.
    pub task_id: &'a TaskId,
    /// Repository to clone.
    pub repo_url: &'a str,
    /// Branch to check out.
    pub branch: &'a BranchName,
    /// Credentials resolved for the task.
    pub credentials: &'a ResolvedCredentials,
    /// Sandbox lifetime in minutes.
    pub timeout_minutes: u32,
}

/// Owns sandbox lifecycle operations and the in-process registry.
///
/// The manager never retries; retry policy belongs to the caller.
pub struct SandboxManager<P>
where
    P: SandboxProvider + 'static,
{
    provider: Arc<P>,
    registry: Arc<SandboxRegistry>,
    settings: SandboxSettings,
}

impl<P> SandboxManager<P>
where
    P: SandboxProvider + 'static,
{
    /// Creates a manager.
    #[must_use]
    pub const fn new(
        provider: Arc<P>,
        registry: Arc<SandboxRegistry>,
        settings: SandboxSettings,
    ) -> Self {
        Self {
            provider,
            registry,
            settings,
        }
    }

    /// Returns the registry of live sandboxes.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SandboxRegistry> {
        &self.registry
    }

    /// Returns the sandbox settings.
    #[must_use]
    pub const fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    /// Creates a sandbox, configures git and checks out the task branch.
    ///
    /// Provider credentials are validated before any provider call. A setup
    /// failure stops the new sandbox before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Configuration`] when provider credentials are
    /// missing and [`SandboxError::ProvisionFailed`] when creation or setup
    /// fails.
    #[instrument(skip_all, fields(task_id = %request.task_id, branch = %request.branch))]
    pub async fn provision(
        &self,
        request: ProvisionRequest<'_>,
    ) -> Result<SandboxHandle, SandboxError> {
        request
            .credentials
            .sandbox()
            .validate()
            .map_err(|err| SandboxError::Configuration(err.to_string()))?;

        let spec = SandboxSpec {
            task_id: request.task_id.clone(),
            repo_url: request.repo_url.to_owned(),
            git_token: request.credentials.git_hosting_token().cloned(),
            branch: request.branch.clone(),
            timeout_minutes: request.timeout_minutes,
            ports: self.settings.ports.clone(),
            resources: self.settings.resources,
            credentials: request.credentials.sandbox().clone(),
        };
        let remote = self
            .provider
            .create(&spec)
            .await
            .map_err(|err| SandboxError::ProvisionFailed(err.to_string()))?;
        info!(sandbox_id = %remote.sandbox_id, "sandbox created");

        let handle = match self.public_url(&remote).await {
            Ok(url) => self.handle_for(request.task_id.clone(), remote, url),
            Err(err) => {
                let handle = self.handle_for(request.task_id.clone(), remote, String::new());
                self.stop(&handle).await;
                return Err(SandboxError::ProvisionFailed(format!(
                    "could not resolve sandbox URL: {err}"
                )));
            }
        };
        if let Err(err) = self.prepare(&handle, request.branch).await {
            self.stop(&handle).await;
            return Err(SandboxError::ProvisionFailed(format!(
                "sandbox setup failed: {err}"
            )));
        }
        Ok(handle)
    }

    /// Returns the registered handle for `task_id`, or reconnects once using
    /// the provider sandbox id.
    ///
    /// Returns `None` when neither succeeds; callers treat this as
    /// "sandbox unavailable".
    #[instrument(skip(self))]
    pub async fn resolve(&self, task_id: &TaskId, sandbox_id: &str) -> Option<SandboxHandle> {
        if let Some(handle) = self.registry.get(task_id) {
            return Some(handle);
        }
        let remote = match self.provider.get(sandbox_id).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(error = %err, "sandbox reconnect failed");
                return None;
            }
        };
        let url = self.public_url(&remote).await.unwrap_or_else(|err| {
            warn!(error = %err, "sandbox URL unavailable after reconnect");
            String::new()
        });
        let handle = self.handle_for(task_id.clone(), remote, url);
        self.register(handle.clone()).await;
        debug!("sandbox reconnected");
        Some(handle)
    }

    /// Registers a handle, stopping any different handle it displaces.
    pub async fn register(&self, handle: SandboxHandle) {
        if let Some(displaced) = self.registry.register(handle.clone())
            && !displaced.same_as(&handle)
        {
            warn!(
                task_id = %handle.task_id(),
                sandbox_id = %displaced.sandbox_id(),
                "replacing live sandbox"
            );
            self.stop(&displaced).await;
        }
    }

    /// Removes the registry entry for `task_id`. Idempotent.
    pub fn unregister(&self, task_id: &TaskId) -> Option<SandboxHandle> {
        self.registry.unregister(task_id)
    }

    /// Stops a sandbox. Failures are logged and never propagated.
    pub async fn stop(&self, handle: &SandboxHandle) {
        match handle.stop().await {
            Ok(()) => info!(
                task_id = %handle.task_id(),
                sandbox_id = %handle.sandbox_id(),
                "sandbox stopped"
            ),
            Err(err) => warn!(
                task_id = %handle.task_id(),
                sandbox_id = %handle.sandbox_id(),
                error = %err,
                "sandbox stop failed"
            ),
        }
    }

    /// Unregisters and stops the sandbox for `task_id`, if any.
    ///
    /// Returns `true` when a sandbox was registered.
    pub async fn teardown(&self, task_id: &TaskId) -> bool {
        let Some(handle) = self.unregister(task_id) else {
            return false;
        };
        self.stop(&handle).await;
        true
    }

    /// Detects the package manager and installs dependencies.
    ///
    /// Returns `None` when no supported manifest exists.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError`] when listing the repository or installing
    /// fails.
    #[instrument(skip_all, fields(task_id = %handle.task_id()))]
    pub async fn install_dependencies(
        &self,
        handle: &SandboxHandle,
    ) -> Result<Option<PackageManager>, SandboxError> {
        let listing = git::run_checked(handle, CommandRequest::new("ls").with_args(["-1A"])).await?;
        let Some(manager) = PackageManager::detect(listing.stdout.lines()) else {
            debug!("no dependency manifest found");
            return Ok(None);
        };
        info!(package_manager = %manager, "installing dependencies");
        git::run_checked(handle, manager.install_command()).await?;
        Ok(Some(manager))
    }

    async fn prepare(&self, handle: &SandboxHandle, branch: &BranchName) -> Result<(), SandboxError> {
        git::configure_identity(
            handle,
            &self.settings.git_user_name,
            &self.settings.git_user_email,
        )
        .await?;
        git::checkout_branch(handle, branch).await
    }

    async fn public_url(&self, remote: &RemoteSandbox) -> Result<String, SandboxError> {
        let Some(port) = self.settings.ports.first() else {
            return Ok(String::new());
        };
        Ok(self.provider.domain(remote, *port).await?)
    }

    fn handle_for(&self, task_id: TaskId, remote: RemoteSandbox, url: String) -> SandboxHandle {
        let provider: Arc<dyn SandboxProvider> = self.provider.clone();
        SandboxHandle::new(task_id, remote, url, provider)
    }
}

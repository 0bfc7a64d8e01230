//! Provisioning request sent to the sandbox provider.

use crate::credentials::domain::{SandboxCredentials, Secret};
use crate::task::domain::{BranchName, TaskId};
use serde::{Deserialize, Serialize};

/// Compute resources requested for a sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSpec {
    /// Virtual CPUs.
    pub vcpus: u8,
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self { vcpus: 4 }
    }
}

/// Everything the provider needs to create a sandbox for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSpec {
    /// Task the sandbox serves.
    pub task_id: TaskId,
    /// Repository to clone.
    pub repo_url: String,
    /// Token used to clone and push, if any.
    pub git_token: Option<Secret>,
    /// Branch the working tree is checked out on.
    pub branch: BranchName,
    /// Lifetime of the sandbox in minutes.
    pub timeout_minutes: u32,
    /// Ports exposed through the provider's domain routing.
    pub ports: Vec<u16>,
    /// Compute resources.
    pub resources: ResourceSpec,
    /// Provider credentials.
    pub credentials: SandboxCredentials,
}

/// Provider-side identity of a created sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSandbox {
    /// Provider sandbox identifier.
    pub sandbox_id: String,
    /// Directory holding the cloned repository.
    pub workdir: String,
}

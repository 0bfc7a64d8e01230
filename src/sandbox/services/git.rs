//! Git operations run inside a sandbox working tree.

use super::SandboxHandle;
use crate::sandbox::domain::{CommandOutput, CommandRequest, SandboxError};
use crate::task::domain::BranchName;
use tracing::debug;

/// Runs `request` and converts a non-zero exit into
/// [`SandboxError::CommandFailed`].
///
/// # Errors
///
/// Returns [`SandboxError::Provider`] when the command could not run and
/// [`SandboxError::CommandFailed`] when it exited unsuccessfully.
pub async fn run_checked(
    handle: &SandboxHandle,
    request: CommandRequest,
) -> Result<CommandOutput, SandboxError> {
    let rendered = request.render();
    let output = handle.run(request).await?;
    if !output.is_success() {
        return Err(SandboxError::CommandFailed {
            command: rendered,
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_owned(),
        });
    }
    Ok(output)
}

fn git<const N: usize>(args: [&str; N]) -> CommandRequest {
    CommandRequest::new("git").with_args(args)
}

/// Returns `true` when the working tree has uncommitted changes.
///
/// Inspects `git status --porcelain`, independent of how the previous
/// command exited.
///
/// # Errors
///
/// Returns [`SandboxError`] when `git status` cannot run.
pub async fn has_changes(handle: &SandboxHandle) -> Result<bool, SandboxError> {
    let output = run_checked(handle, git(["status", "--porcelain"])).await?;
    Ok(!output.stdout.trim().is_empty())
}

/// Sets the commit identity for the repository.
///
/// # Errors
///
/// Returns [`SandboxError`] when either `git config` call fails.
pub async fn configure_identity(
    handle: &SandboxHandle,
    name: &str,
    email: &str,
) -> Result<(), SandboxError> {
    run_checked(handle, git(["config", "user.name", name])).await?;
    run_checked(handle, git(["config", "user.email", email])).await?;
    Ok(())
}

/// Checks out `branch`, tracking `origin/<branch>` when it already exists.
///
/// # Errors
///
/// Returns [`SandboxError`] when fetching or checking out fails.
pub async fn checkout_branch(handle: &SandboxHandle, branch: &BranchName) -> Result<(), SandboxError> {
    let remote = handle
        .run(git(["ls-remote", "--exit-code", "--heads", "origin", branch.as_str()]))
        .await?;
    if remote.is_success() {
        debug!(task_id = %handle.task_id(), branch = %branch, "tracking existing remote branch");
        run_checked(handle, git(["fetch", "origin", branch.as_str()])).await?;
        let tracking = format!("origin/{branch}");
        run_checked(
            handle,
            git(["checkout", "-B", branch.as_str(), "--track", tracking.as_str()]),
        )
        .await?;
    } else {
        run_checked(handle, git(["checkout", "-b", branch.as_str()])).await?;
    }
    Ok(())
}

/// Stages every change and commits it.
///
/// # Errors
///
/// Returns [`SandboxError`] when staging or committing fails.
pub async fn commit_all(handle: &SandboxHandle, message: &str) -> Result<(), SandboxError> {
    run_checked(handle, git(["add", "-A"])).await?;
    run_checked(handle, git(["commit", "-m", message])).await?;
    Ok(())
}

/// Pushes `branch` to `origin` and sets its upstream.
///
/// # Errors
///
/// Returns [`SandboxError`] when the push fails.
pub async fn push(handle: &SandboxHandle, branch: &BranchName) -> Result<(), SandboxError> {
    run_checked(handle, git(["push", "-u", "origin", branch.as_str()])).await?;
    Ok(())
}

//! Agent backends driven through a CLI installed in the sandbox.
//!
//! Each CLI differs only in how it is installed, where it reads connector
//! configuration, how it is invoked and what its output looks like. Those
//! differences live in a [`CliProfile`]; [`CliAgentBackend`] runs the shared
//! sequence:
//!
//! 1. install the CLI when `command -v` cannot find it,
//! 2. write the MCP configuration when connectors are present,
//! 3. run the invocation and parse its output.

mod claude;
mod codex;
mod copilot;
mod cursor;
mod gemini;
mod opencode;
mod output;

pub use claude::ClaudeProfile;
pub use codex::CodexProfile;
pub use copilot::CopilotProfile;
pub use cursor::CursorProfile;
pub use gemini::GeminiProfile;
pub use opencode::OpenCodeProfile;
pub use output::ParsedOutput;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::agent::{
    domain::{AgentKind, render_mcp_config},
    ports::{AgentBackend, AgentBackendError, AgentInvocation, BackendOutput},
};
use crate::sandbox::{
    domain::{CommandRequest, shell_quote},
    services::CredentialScope,
};

/// CLI-specific behaviour of an agent backend.
pub trait CliProfile: Send + Sync {
    /// Returns the backend served by this profile.
    fn kind(&self) -> AgentKind;

    /// Returns the executable name.
    fn binary(&self) -> &'static str;

    /// Returns the command that installs the CLI.
    fn install_command(&self) -> CommandRequest;

    /// Returns where the CLI reads its MCP configuration, or `None` when it
    /// has no file-based connector support.
    ///
    /// Paths may reference `$HOME`.
    fn mcp_config_path(&self) -> Option<&'static str>;

    /// Builds the command that runs the agent.
    fn invocation(&self, invocation: &AgentInvocation) -> CommandRequest;

    /// Extracts the response and session from captured stdout.
    fn parse_output(&self, stdout: &str) -> ParsedOutput;
}

/// [`AgentBackend`] that runs a [`CliProfile`] inside the sandbox.
#[derive(Debug, Clone, Default)]
pub struct CliAgentBackend<P> {
    profile: P,
}

impl<P> CliAgentBackend<P>
where
    P: CliProfile,
{
    /// Wraps a profile.
    #[must_use]
    pub const fn new(profile: P) -> Self {
        Self { profile }
    }

    /// Returns the profile.
    #[must_use]
    pub const fn profile(&self) -> &P {
        &self.profile
    }

    async fn ensure_installed(&self, scope: &CredentialScope<'_>) -> Result<(), AgentBackendError> {
        let binary = self.profile.binary();
        let probe = scope
            .run(CommandRequest::shell(format!("command -v {binary}")))
            .await?;
        if probe.is_success() {
            return Ok(());
        }
        info!(task_id = %scope.handle().task_id(), binary, "installing agent CLI");
        let install = scope.run(self.profile.install_command()).await?;
        if install.is_success() {
            Ok(())
        } else {
            Err(AgentBackendError::InstallFailed {
                binary: binary.to_owned(),
                stderr: install.stderr.trim().to_owned(),
            })
        }
    }

    async fn configure_connectors(
        &self,
        scope: &CredentialScope<'_>,
        invocation: &AgentInvocation,
    ) -> Result<(), AgentBackendError> {
        if invocation.connectors.is_empty() {
            return Ok(());
        }
        let Some(path) = self.profile.mcp_config_path() else {
            warn!(
                task_id = %scope.handle().task_id(),
                agent = %self.profile.kind(),
                "agent has no connector support; connectors ignored"
            );
            return Ok(());
        };
        let document = render_mcp_config(&invocation.connectors).to_string();
        let script = format!(
            "mkdir -p \"$(dirname \"{path}\")\" && printf '%s' {} > \"{path}\"",
            shell_quote(&document)
        );
        let written = scope.run(CommandRequest::shell(script)).await?;
        if !written.is_success() {
            return Err(AgentBackendError::ConnectorSetup(
                written.stderr.trim().to_owned(),
            ));
        }
        debug!(
            task_id = %scope.handle().task_id(),
            count = invocation.connectors.len(),
            "connectors configured"
        );
        Ok(())
    }
}

#[async_trait]
impl<P> AgentBackend for CliAgentBackend<P>
where
    P: CliProfile,
{
    fn kind(&self) -> AgentKind {
        self.profile.kind()
    }

    async fn run(
        &self,
        scope: &CredentialScope<'_>,
        invocation: &AgentInvocation,
    ) -> Result<BackendOutput, AgentBackendError> {
        self.ensure_installed(scope).await?;
        self.configure_connectors(scope, invocation).await?;

        let output = scope.run(self.profile.invocation(invocation)).await?;
        let parsed = self.profile.parse_output(&output.stdout);
        let error = parsed.error.or_else(|| {
            (!output.is_success()).then(|| {
                let stderr = output.stderr.trim();
                if stderr.is_empty() {
                    format!("{} exited with code {}", self.profile.binary(), output.exit_code)
                } else {
                    stderr.to_owned()
                }
            })
        });
        Ok(BackendOutput {
            success: error.is_none(),
            response: parsed.response,
            session_id: parsed.session_id,
            error,
        })
    }
}

/// Appends `flag value` when `value` is present.
fn push_optional(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(present) = value {
        args.push(flag.to_owned());
        args.push(present.to_owned());
    }
}

/// Installs an npm package globally.
fn npm_install(package: &str) -> CommandRequest {
    CommandRequest::new("npm").with_args(["install", "-g", package])
}

//! GitHub Copilot CLI.

use super::{CliProfile, ParsedOutput, npm_install, push_optional};
use crate::agent::{domain::AgentKind, ports::AgentInvocation};
use crate::sandbox::domain::CommandRequest;

/// Profile for the Copilot CLI.
///
/// Copilot authenticates with the git-hosting token and prints plain text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopilotProfile;

impl CliProfile for CopilotProfile {
    fn kind(&self) -> AgentKind {
        AgentKind::Copilot
    }

    fn binary(&self) -> &'static str {
        "copilot"
    }

    fn install_command(&self) -> CommandRequest {
        npm_install("@github/copilot")
    }

    fn mcp_config_path(&self) -> Option<&'static str> {
        Some("$HOME/.copilot/mcp-config.json")
    }

    fn invocation(&self, invocation: &AgentInvocation) -> CommandRequest {
        let mut args = vec![
            "-p".to_owned(),
            invocation.instruction.clone(),
            "--allow-all-tools".to_owned(),
        ];
        push_optional(&mut args, "--model", invocation.model.as_deref());
        push_optional(&mut args, "--resume", invocation.resume_session.as_deref());
        CommandRequest::new(self.binary()).with_args(args)
    }

    fn parse_output(&self, stdout: &str) -> ParsedOutput {
        ParsedOutput::plain(stdout)
    }
}

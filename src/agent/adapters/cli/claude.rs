//! Claude Code CLI.
//!
//! Invoked as `claude -p <instruction> --output-format json`. The single
//! JSON envelope carries `result`, `is_error` and `session_id`.

use super::{CliProfile, ParsedOutput, npm_install, output, push_optional};
use crate::agent::{domain::AgentKind, ports::AgentInvocation};
use crate::sandbox::domain::{CommandRequest, shell_quote};
use serde_json::Value;

const MCP_CONFIG_PATH: &str = "$HOME/.foreman/claude-mcp.json";

/// Profile for the Claude Code CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaudeProfile;

impl CliProfile for ClaudeProfile {
    fn kind(&self) -> AgentKind {
        AgentKind::Claude
    }

    fn binary(&self) -> &'static str {
        "claude"
    }

    fn install_command(&self) -> CommandRequest {
        npm_install("@anthropic-ai/claude-code")
    }

    fn mcp_config_path(&self) -> Option<&'static str> {
        Some(MCP_CONFIG_PATH)
    }

    fn invocation(&self, invocation: &AgentInvocation) -> CommandRequest {
        let mut args = vec![
            "-p".to_owned(),
            invocation.instruction.clone(),
            "--output-format".to_owned(),
            "json".to_owned(),
            "--dangerously-skip-permissions".to_owned(),
        ];
        push_optional(&mut args, "--model", invocation.model.as_deref());
        push_optional(&mut args, "--resume", invocation.resume_session.as_deref());
        if !invocation.connectors.is_empty() {
            let quoted: Vec<String> = args.iter().map(|arg| shell_quote(arg)).collect();
            // $HOME is only expanded by a shell.
            return CommandRequest::shell(format!(
                "claude {} --mcp-config \"{MCP_CONFIG_PATH}\"",
                quoted.join(" ")
            ));
        }
        CommandRequest::new(self.binary()).with_args(args)
    }

    fn parse_output(&self, stdout: &str) -> ParsedOutput {
        let Some(envelope) = output::json_envelope(stdout) else {
            return ParsedOutput::plain(stdout);
        };
        let response = output::text_field(&envelope, "result").unwrap_or_default();
        let is_error = envelope
            .get("is_error")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        ParsedOutput {
            error: is_error.then(|| {
                if response.is_empty() {
                    "claude reported an error".to_owned()
                } else {
                    response.clone()
                }
            }),
            session_id: output::text_field(&envelope, "session_id"),
            response,
        }
    }
}

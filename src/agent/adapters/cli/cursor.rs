//! Cursor agent CLI.

use super::{CliProfile, ParsedOutput, output, push_optional};
use crate::agent::{domain::AgentKind, ports::AgentInvocation};
use crate::sandbox::domain::CommandRequest;
use serde_json::Value;

/// Profile for `cursor-agent`.
///
/// Output mirrors the Claude envelope: `result`, `is_error` and
/// `session_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorProfile;

impl CliProfile for CursorProfile {
    fn kind(&self) -> AgentKind {
        AgentKind::Cursor
    }

    fn binary(&self) -> &'static str {
        "cursor-agent"
    }

    fn install_command(&self) -> CommandRequest {
        CommandRequest::shell("curl -fsS https://cursor.com/install | bash")
    }

    fn mcp_config_path(&self) -> Option<&'static str> {
        Some("$HOME/.cursor/mcp.json")
    }

    fn invocation(&self, invocation: &AgentInvocation) -> CommandRequest {
        let mut args = vec![
            "-p".to_owned(),
            invocation.instruction.clone(),
            "--output-format".to_owned(),
            "json".to_owned(),
            "--force".to_owned(),
        ];
        push_optional(&mut args, "--model", invocation.model.as_deref());
        push_optional(&mut args, "--resume", invocation.resume_session.as_deref());
        CommandRequest::new(self.binary()).with_args(args)
    }

    fn parse_output(&self, stdout: &str) -> ParsedOutput {
        let Some(envelope) = output::json_envelope(stdout) else {
            return ParsedOutput::plain(stdout);
        };
        let response = output::text_field(&envelope, "result").unwrap_or_default();
        let failed = envelope
            .get("is_error")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        ParsedOutput {
            error: failed.then(|| response.clone()),
            session_id: output::text_field(&envelope, "session_id"),
            response,
        }
    }
}

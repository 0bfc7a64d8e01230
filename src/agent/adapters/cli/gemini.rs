//! Gemini CLI.

use super::{CliProfile, ParsedOutput, npm_install, output, push_optional};
use crate::agent::{domain::AgentKind, ports::AgentInvocation};
use crate::sandbox::domain::CommandRequest;

/// Profile for the Gemini CLI.
///
/// `--output-format json` prints `{"response": ..., "error": {...}}`. The
/// CLI has no resumable session identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeminiProfile;

impl CliProfile for GeminiProfile {
    fn kind(&self) -> AgentKind {
        AgentKind::Gemini
    }

    fn binary(&self) -> &'static str {
        "gemini"
    }

    fn install_command(&self) -> CommandRequest {
        npm_install("@google/gemini-cli")
    }

    fn mcp_config_path(&self) -> Option<&'static str> {
        Some("$HOME/.gemini/settings.json")
    }

    fn invocation(&self, invocation: &AgentInvocation) -> CommandRequest {
        let mut args = vec![
            "-p".to_owned(),
            invocation.instruction.clone(),
            "--output-format".to_owned(),
            "json".to_owned(),
            "--yolo".to_owned(),
        ];
        push_optional(&mut args, "--model", invocation.model.as_deref());
        CommandRequest::new(self.binary()).with_args(args)
    }

    fn parse_output(&self, stdout: &str) -> ParsedOutput {
        let Some(envelope) = output::json_envelope(stdout) else {
            return ParsedOutput::plain(stdout);
        };
        ParsedOutput {
            response: output::text_field(&envelope, "response").unwrap_or_default(),
            session_id: None,
            error: output::text_at(&envelope, "/error/message"),
        }
    }
}

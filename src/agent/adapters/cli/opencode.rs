//! `OpenCode` CLI.

use super::{CliProfile, ParsedOutput, npm_install, output, push_optional};
use crate::agent::{domain::AgentKind, ports::AgentInvocation};
use crate::sandbox::domain::CommandRequest;

/// Profile for `opencode run --format json`.
///
/// The NDJSON stream carries `text` events with `part.text` and a
/// `sessionID` on every event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenCodeProfile;

impl CliProfile for OpenCodeProfile {
    fn kind(&self) -> AgentKind {
        AgentKind::OpenCode
    }

    fn binary(&self) -> &'static str {
        "opencode"
    }

    fn install_command(&self) -> CommandRequest {
        npm_install("opencode-ai")
    }

    fn mcp_config_path(&self) -> Option<&'static str> {
        None
    }

    fn invocation(&self, invocation: &AgentInvocation) -> CommandRequest {
        let mut args = vec!["run".to_owned(), "--format".to_owned(), "json".to_owned()];
        push_optional(&mut args, "-m", invocation.model.as_deref());
        push_optional(&mut args, "--session", invocation.resume_session.as_deref());
        args.push(invocation.instruction.clone());
        CommandRequest::new(self.binary()).with_args(args)
    }

    fn parse_output(&self, stdout: &str) -> ParsedOutput {
        let events = output::ndjson_events(stdout);
        if events.is_empty() {
            return ParsedOutput::plain(stdout);
        }
        let mut parsed = ParsedOutput::default();
        for event in &events {
            if parsed.session_id.is_none() {
                parsed.session_id = output::text_field(event, "sessionID");
            }
            match output::event_type(event) {
                "text" => {
                    if let Some(text) = output::text_at(event, "/part/text") {
                        parsed.response.push_str(&text);
                    }
                }
                "error" => {
                    parsed.error = output::text_field(event, "message")
                        .or_else(|| output::text_at(event, "/error/data/message"))
                        .or_else(|| Some("opencode reported an error".to_owned()));
                }
                _ => {}
            }
        }
        parsed
    }
}

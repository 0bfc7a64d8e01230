//! `OpenAI` Codex CLI.
//!
//! `codex exec --json` streams NDJSON events. `thread.started` carries the
//! resumable `thread_id`; completed `agent_message` items carry the
//! response text; `error` and `turn.failed` events carry failures.

use super::{CliProfile, ParsedOutput, npm_install, output, push_optional};
use crate::agent::{domain::AgentKind, ports::AgentInvocation};
use crate::sandbox::domain::CommandRequest;

/// Profile for the Codex CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodexProfile;

impl CliProfile for CodexProfile {
    fn kind(&self) -> AgentKind {
        AgentKind::Codex
    }

    fn binary(&self) -> &'static str {
        "codex"
    }

    fn install_command(&self) -> CommandRequest {
        npm_install("@openai/codex")
    }

    fn mcp_config_path(&self) -> Option<&'static str> {
        None
    }

    fn invocation(&self, invocation: &AgentInvocation) -> CommandRequest {
        let mut args = vec!["exec".to_owned()];
        if let Some(session) = &invocation.resume_session {
            args.push("resume".to_owned());
            args.push(session.clone());
        }
        args.push("--json".to_owned());
        args.push("--dangerously-bypass-approvals-and-sandbox".to_owned());
        push_optional(&mut args, "--model", invocation.model.as_deref());
        args.push(invocation.instruction.clone());
        CommandRequest::new(self.binary()).with_args(args)
    }

    fn parse_output(&self, stdout: &str) -> ParsedOutput {
        let events = output::ndjson_events(stdout);
        if events.is_empty() {
            return ParsedOutput::plain(stdout);
        }
        let mut parsed = ParsedOutput::default();
        let mut messages = Vec::new();
        for event in &events {
            match output::event_type(event) {
                "thread.started" => parsed.session_id = output::text_field(event, "thread_id"),
                "item.completed" => {
                    if output::text_at(event, "/item/type").as_deref() == Some("agent_message")
                        && let Some(text) = output::text_at(event, "/item/text")
                    {
                        messages.push(text);
                    }
                }
                "error" => parsed.error = output::text_field(event, "message"),
                "turn.failed" => parsed.error = output::text_at(event, "/error/message"),
                _ => {}
            }
        }
        parsed.response = messages.join("\n\n");
        parsed
    }
}

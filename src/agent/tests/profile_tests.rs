//! Tests for CLI invocation and output parsing.

use crate::agent::{
    adapters::cli::{
        ClaudeProfile, CliProfile, CodexProfile, CopilotProfile, CursorProfile, GeminiProfile,
        OpenCodeProfile, ParsedOutput,
    },
    domain::{Connector, ConnectorTransport},
    ports::AgentInvocation,
};
use eyre::Result;
use rstest::rstest;

fn invocation() -> AgentInvocation {
    AgentInvocation::new("Add a health endpoint").with_model(Some("fast-model".to_owned()))
}

#[rstest]
fn claude_parses_json_envelope() {
    let stdout = r#"{"type":"result","is_error":false,"result":"Added /health","session_id":"sess-1"}"#;

    let parsed = ClaudeProfile.parse_output(stdout);

    assert_eq!(
        parsed,
        ParsedOutput {
            response: "Added /health".to_owned(),
            session_id: Some("sess-1".to_owned()),
            error: None,
        }
    );
}

#[rstest]
fn claude_reports_envelope_errors() {
    let stdout = "warming up\n{\"is_error\":true,\"result\":\"credit balance too low\"}";

    let parsed = ClaudeProfile.parse_output(stdout);

    assert_eq!(parsed.error.as_deref(), Some("credit balance too low"));
}

#[rstest]
fn claude_falls_back_to_plain_text() {
    let parsed = ClaudeProfile.parse_output("  not json at all \n");

    assert_eq!(parsed, ParsedOutput::plain("not json at all"));
}

#[rstest]
fn claude_invocation_passes_model_and_session() {
    let request = ClaudeProfile.invocation(
        &invocation().with_resume_session(Some("sess-1".to_owned())),
    );

    assert_eq!(request.command(), "claude");
    let args = request.args();
    assert!(args.windows(2).any(|pair| pair == ["--model", "fast-model"]));
    assert!(args.windows(2).any(|pair| pair == ["--resume", "sess-1"]));
    assert!(args.iter().any(|arg| arg == "Add a health endpoint"));
}

#[rstest]
fn claude_invocation_points_at_connector_config() -> Result<()> {
    let connector = Connector::new(
        "docs",
        ConnectorTransport::Http {
            url: "https://docs.example/mcp".to_owned(),
        },
    )?;

    let request = ClaudeProfile.invocation(&invocation().with_connectors(vec![connector]));

    assert_eq!(request.command(), "sh");
    assert!(request.render().contains("--mcp-config"));
    Ok(())
}

#[rstest]
fn codex_collects_thread_and_messages() {
    let stdout = [
        r#"{"type":"thread.started","thread_id":"thread-9"}"#,
        r#"{"type":"item.completed","item":{"type":"reasoning","text":"thinking"}}"#,
        r#"{"type":"item.completed","item":{"type":"agent_message","text":"Done."}}"#,
        r#"{"type":"turn.completed","usage":{"input_tokens":10}}"#,
    ]
    .join("\n");

    let parsed = CodexProfile.parse_output(&stdout);

    assert_eq!(parsed.response, "Done.");
    assert_eq!(parsed.session_id.as_deref(), Some("thread-9"));
    assert!(parsed.error.is_none());
}

#[rstest]
fn codex_reports_failed_turns() {
    let stdout = r#"{"type":"turn.failed","error":{"message":"usage limit reached"}}"#;

    let parsed = CodexProfile.parse_output(stdout);

    assert_eq!(parsed.error.as_deref(), Some("usage limit reached"));
}

#[rstest]
fn codex_resume_uses_subcommand() {
    let request = CodexProfile.invocation(
        &AgentInvocation::new("continue").with_resume_session(Some("thread-9".to_owned())),
    );

    let args = request.args();
    assert_eq!(args.get(..3), Some(&["exec".to_owned(), "resume".to_owned(), "thread-9".to_owned()][..]));
    assert_eq!(args.last().map(String::as_str), Some("continue"));
}

#[rstest]
fn opencode_concatenates_text_events() {
    let stdout = [
        r#"{"type":"step_start","sessionID":"ses_1","part":{"type":"step-start"}}"#,
        r#"{"type":"text","sessionID":"ses_1","part":{"type":"text","text":"Hello, "}}"#,
        r#"{"type":"text","sessionID":"ses_1","part":{"type":"text","text":"world"}}"#,
    ]
    .join("\n");

    let parsed = OpenCodeProfile.parse_output(&stdout);

    assert_eq!(parsed.response, "Hello, world");
    assert_eq!(parsed.session_id.as_deref(), Some("ses_1"));
}

#[rstest]
fn gemini_reads_response_and_error() {
    let parsed =
        GeminiProfile.parse_output(r#"{"response":"","error":{"message":"quota exceeded"}}"#);

    assert_eq!(parsed.error.as_deref(), Some("quota exceeded"));
    assert!(parsed.session_id.is_none());
}

#[rstest]
fn cursor_reads_session() {
    let parsed = CursorProfile
        .parse_output(r#"{"type":"result","is_error":false,"result":"ok","session_id":"c-1"}"#);

    assert_eq!(parsed.session_id.as_deref(), Some("c-1"));
    assert_eq!(parsed.response, "ok");
}

#[rstest]
fn copilot_output_is_plain_text() {
    let parsed = CopilotProfile.parse_output("Updated README.md\n");

    assert_eq!(parsed.response, "Updated README.md");
    assert_eq!(CopilotProfile.binary(), "copilot");
}

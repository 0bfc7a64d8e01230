//! Parsing helpers shared by CLI profiles.

use serde_json::Value;
use tracing::debug;

/// Response, session and error extracted from CLI output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    /// Final response text.
    pub response: String,
    /// Resumable session identifier.
    pub session_id: Option<String>,
    /// Error reported inside the output itself.
    pub error: Option<String>,
}

impl ParsedOutput {
    /// Treats the whole of `stdout` as the response.
    #[must_use]
    pub fn plain(stdout: &str) -> Self {
        Self {
            response: stdout.trim().to_owned(),
            ..Self::default()
        }
    }
}

/// Parses a single JSON document, tolerating log lines before it.
///
/// Tries the whole output first, then each line from the end.
pub(super) fn json_envelope(stdout: &str) -> Option<Value> {
    let trimmed = stdout.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    trimmed
        .lines()
        .rev()
        .find_map(|line| match serde_json::from_str::<Value>(line.trim()) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        })
}

/// Parses newline-delimited JSON events, skipping lines that are not JSON.
pub(super) fn ndjson_events(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(error = %err, "skipping unparseable output line");
                None
            }
        })
        .collect()
}

/// Returns a string field of a JSON object.
pub(super) fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Returns the string at a `/`-separated JSON pointer.
pub(super) fn text_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Returns the `type` discriminator of an event.
pub(super) fn event_type(value: &Value) -> &str {
    value.get("type").and_then(Value::as_str).unwrap_or_default()
}

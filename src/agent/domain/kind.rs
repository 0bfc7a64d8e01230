//! Supported coding-agent backends.

use super::ParseAgentKindError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coding-agent backend a task can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Anthropic Claude Code CLI.
    Claude,
    /// `OpenAI` Codex CLI.
    Codex,
    /// GitHub Copilot CLI.
    Copilot,
    /// Cursor agent CLI.
    Cursor,
    /// Google Gemini CLI.
    Gemini,
    /// `OpenCode` CLI.
    #[serde(rename = "opencode")]
    OpenCode,
    /// Sourcegraph Amp CLI.
    Amp,
    /// Factory Droid CLI.
    Droid,
}

impl AgentKind {
    /// Every backend, in display order.
    pub const ALL: [Self; 8] = [
        Self::Claude,
        Self::Codex,
        Self::Copilot,
        Self::Cursor,
        Self::Gemini,
        Self::OpenCode,
        Self::Amp,
        Self::Droid,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Copilot => "copilot",
            Self::Cursor => "cursor",
            Self::Gemini => "gemini",
            Self::OpenCode => "opencode",
            Self::Amp => "amp",
            Self::Droid => "droid",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AgentKind {
    type Error = ParseAgentKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseAgentKindError(value.to_owned()))
    }
}

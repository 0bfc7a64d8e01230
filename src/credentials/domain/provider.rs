//! Model vendors whose API keys the engine manages.

use crate::agent::domain::AgentKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor an API key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    /// Anthropic.
    Anthropic,
    /// `OpenAI`.
    #[serde(rename = "openai")]
    OpenAi,
    /// Google Gemini.
    Gemini,
    /// Cursor.
    Cursor,
    /// Sourcegraph Amp.
    Amp,
    /// Factory.
    Factory,
}

impl ApiProvider {
    /// Every provider.
    pub const ALL: [Self; 6] = [
        Self::Anthropic,
        Self::OpenAi,
        Self::Gemini,
        Self::Cursor,
        Self::Amp,
        Self::Factory,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Cursor => "cursor",
            Self::Amp => "amp",
            Self::Factory => "factory",
        }
    }

    /// Returns the environment variable agent CLIs read the key from.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::Cursor => "CURSOR_API_KEY",
            Self::Amp => "AMP_API_KEY",
            Self::Factory => "FACTORY_API_KEY",
        }
    }

    /// Returns the providers whose keys `agent` can use.
    ///
    /// Copilot authenticates with the git-hosting token and needs no API
    /// key. `OpenCode` accepts either `OpenAI` or Anthropic.
    #[must_use]
    pub const fn for_agent(agent: AgentKind) -> &'static [Self] {
        match agent {
            AgentKind::Claude => &[Self::Anthropic],
            AgentKind::Codex => &[Self::OpenAi],
            AgentKind::Copilot => &[],
            AgentKind::Cursor => &[Self::Cursor],
            AgentKind::Gemini => &[Self::Gemini],
            AgentKind::OpenCode => &[Self::OpenAi, Self::Anthropic],
            AgentKind::Amp => &[Self::Amp],
            AgentKind::Droid => &[Self::Factory],
        }
    }
}

impl fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

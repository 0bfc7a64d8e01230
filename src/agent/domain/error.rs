//! Error types for agent domain validation.

use thiserror::Error;

/// Errors returned while constructing agent domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentDomainError {
    /// The connector name is blank or malformed.
    #[error("invalid connector name '{0}'")]
    InvalidConnectorName(String),

    /// A STDIO connector has no command.
    #[error("connector command must not be empty")]
    EmptyConnectorCommand,

    /// An HTTP connector URL is not HTTP(S).
    #[error("invalid connector URL '{0}', expected http:// or https://")]
    InvalidConnectorUrl(String),
}

/// Error returned while parsing agent names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown agent: {0}")]
pub struct ParseAgentKindError(pub String);

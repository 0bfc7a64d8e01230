//! Auxiliary tool servers made available to an agent during a run.

use super::AgentDomainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Connector process launched over STDIO inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioConnector {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl StdioConnector {
    /// Creates a STDIO connector.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDomainError::EmptyConnectorCommand`] when `command` is
    /// blank.
    pub fn new(command: impl Into<String>) -> Result<Self, AgentDomainError> {
        let normalized_command = command.into().trim().to_owned();
        if normalized_command.is_empty() {
            return Err(AgentDomainError::EmptyConnectorCommand);
        }
        Ok(Self {
            command: normalized_command,
            args: Vec::new(),
            env: BTreeMap::new(),
        })
    }

    /// Sets command-line arguments.
    #[must_use]
    pub fn with_args(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.args = values.into_iter().collect();
        self
    }

    /// Sets environment variables for the connector process.
    #[must_use]
    pub fn with_env(mut self, values: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = values.into_iter().collect();
        self
    }

    /// Returns the executable command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns command-line arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns environment variables.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

/// How an agent reaches a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "config")]
pub enum ConnectorTransport {
    /// Local process speaking over STDIO.
    Stdio(StdioConnector),
    /// Remote server reached over HTTP.
    Http {
        /// Server URL.
        url: String,
    },
}

/// A named tool server offered to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    name: String,
    transport: ConnectorTransport,
}

impl Connector {
    /// Creates a connector.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDomainError::InvalidConnectorName`] when the name is
    /// blank or contains characters outside `[A-Za-z0-9_-]`, and
    /// [`AgentDomainError::InvalidConnectorUrl`] for HTTP transports whose
    /// URL is not `http://` or `https://`.
    pub fn new(
        name: impl Into<String>,
        transport: ConnectorTransport,
    ) -> Result<Self, AgentDomainError> {
        let raw = name.into();
        let normalized = raw.trim();
        let valid_name = !normalized.is_empty()
            && normalized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_name {
            return Err(AgentDomainError::InvalidConnectorName(raw));
        }
        if let ConnectorTransport::Http { url } = &transport
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(AgentDomainError::InvalidConnectorUrl(url.clone()));
        }
        Ok(Self {
            name: normalized.to_owned(),
            transport,
        })
    }

    /// Returns the connector name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &ConnectorTransport {
        &self.transport
    }

    /// Renders the connector as an `mcpServers` entry.
    #[must_use]
    pub fn to_server_entry(&self) -> Value {
        match &self.transport {
            ConnectorTransport::Stdio(stdio) => json!({
                "command": stdio.command(),
                "args": stdio.args(),
                "env": stdio.env(),
            }),
            ConnectorTransport::Http { url } => json!({
                "type": "http",
                "url": url,
            }),
        }
    }
}

/// Renders connectors as an MCP configuration document.
///
/// The result has the shape `{"mcpServers": {"<name>": {...}}}` accepted by
/// most agent CLIs.
#[must_use]
pub fn render_mcp_config(connectors: &[Connector]) -> Value {
    let servers: Map<String, Value> = connectors
        .iter()
        .map(|connector| (connector.name().to_owned(), connector.to_server_entry()))
        .collect();
    json!({ "mcpServers": servers })
}

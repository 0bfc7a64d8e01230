//! Tests for connector validation and MCP rendering.

use crate::agent::domain::{
    AgentDomainError, Connector, ConnectorTransport, StdioConnector, render_mcp_config,
};
use eyre::Result;
use rstest::rstest;
use serde_json::json;

#[rstest]
fn renders_stdio_and_http_servers() -> Result<()> {
    let stdio = StdioConnector::new("npx")?
        .with_args(["-y".to_owned(), "@acme/mcp".to_owned()])
        .with_env([("ACME_TOKEN".to_owned(), "t".to_owned())]);
    let connectors = vec![
        Connector::new("acme", ConnectorTransport::Stdio(stdio))?,
        Connector::new(
            "docs",
            ConnectorTransport::Http {
                url: "https://docs.example/mcp".to_owned(),
            },
        )?,
    ];

    let rendered = render_mcp_config(&connectors);

    assert_eq!(
        rendered,
        json!({
            "mcpServers": {
                "acme": {"command": "npx", "args": ["-y", "@acme/mcp"], "env": {"ACME_TOKEN": "t"}},
                "docs": {"type": "http", "url": "https://docs.example/mcp"}
            }
        })
    );
    Ok(())
}

#[rstest]
#[case("")]
#[case("has space")]
#[case("semi;colon")]
fn rejects_malformed_names(#[case] name: &str) {
    let result = Connector::new(
        name,
        ConnectorTransport::Http {
            url: "https://x.example".to_owned(),
        },
    );

    assert!(matches!(result, Err(AgentDomainError::InvalidConnectorName(_))));
}

#[rstest]
fn rejects_non_http_urls() {
    let result = Connector::new(
        "files",
        ConnectorTransport::Http {
            url: "file:///etc/passwd".to_owned(),
        },
    );

    assert!(matches!(result, Err(AgentDomainError::InvalidConnectorUrl(_))));
}

#[rstest]
fn rejects_blank_stdio_command() {
    assert_eq!(
        StdioConnector::new("  ").err(),
        Some(AgentDomainError::EmptyConnectorCommand)
    );
}

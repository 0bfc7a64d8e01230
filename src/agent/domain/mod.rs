//! Domain model for agent execution.

mod connector;
mod error;
mod kind;
mod result;

pub use connector::{Connector, ConnectorTransport, StdioConnector, render_mcp_config};
pub use error::{AgentDomainError, ParseAgentKindError};
pub use kind::AgentKind;
pub use result::AgentExecutionResult;

//! Agent execution services.

mod cancellation;
mod catalog;
mod executor;

pub use cancellation::CancellationFlag;
pub use catalog::AgentCatalog;
pub use executor::{AgentExecutor, ExecutionRequest};

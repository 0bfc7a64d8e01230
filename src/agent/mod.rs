//! Agent execution across interchangeable coding-agent backends.
//!
//! The executor picks a backend from the [`services::AgentCatalog`], injects
//! only that backend's credentials into the task sandbox, runs the CLI and
//! records the response as an agent message. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - CLI backends in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

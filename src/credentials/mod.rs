//! Credential resolution for task runs.
//!
//! Resolves, per task, the provider API keys and git-hosting token injected
//! into the sandbox, falling back from per-user stored values to
//! process-wide defaults. Follows the same layering as the other contexts:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Resolution services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

//! Foreman: builder task orchestration engine.
//!
//! Foreman turns a natural-language coding instruction into a cancellable
//! task executed by one of several AI coding-agent CLIs inside an ephemeral
//! remote sandbox, then commits and pushes the result to a task branch.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: In-memory and HTTP implementations of ports
//! - **Services**: Orchestration over ports
//!
//! # Modules
//!
//! - [`task`]: Task records, the state machine and user control actions
//! - [`runner`]: The task runner and its background worker
//! - [`sandbox`]: Sandbox provisioning, registry and teardown
//! - [`agent`]: Agent CLI backends and execution
//! - [`credentials`]: Per-user credential resolution
//! - [`naming`]: Branch name generation with deterministic fallback
//! - [`pull_request`]: Pull request lifecycle over the git-hosting API
//! - [`rate_limit`]: Daily request quotas
//! - [`config`]: TOML and environment configuration
//! - [`telemetry`]: `tracing` subscriber setup

pub mod agent;
pub mod config;
pub mod credentials;
pub mod naming;
pub mod pull_request;
pub mod rate_limit;
pub mod runner;
pub mod sandbox;
pub mod task;
pub mod telemetry;

#[cfg(test)]
mod test_support;

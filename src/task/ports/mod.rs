//! Port contracts for task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod identity;
pub mod store;

pub use identity::SessionIdentity;
pub use store::{TaskStore, TaskStoreError, TaskStoreResult};

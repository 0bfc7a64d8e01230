//! Git-hosting adapters.

pub mod github;
pub mod memory;

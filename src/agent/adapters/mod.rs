//! Agent backend implementations.

pub mod cli;
pub mod pending;

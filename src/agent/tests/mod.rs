//! Unit tests for agent execution.

mod connector_tests;
mod profile_tests;

//! Unit tests for credential resolution.

mod resolver_tests;

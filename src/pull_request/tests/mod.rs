//! Unit tests for the pull-request lifecycle.

mod service_tests;

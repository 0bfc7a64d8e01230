//! Unit tests for the task runner.

mod cancellation_tests;
mod redaction_tests;
mod runner_tests;
mod support;
mod worker_tests;

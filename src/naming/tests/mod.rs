//! Unit tests for branch naming.

mod namer_tests;

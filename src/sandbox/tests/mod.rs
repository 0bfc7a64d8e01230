//! Unit tests for sandbox lifecycle management.

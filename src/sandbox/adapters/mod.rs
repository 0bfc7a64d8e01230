//! Adapter implementations for sandbox provider ports.

pub mod memory;

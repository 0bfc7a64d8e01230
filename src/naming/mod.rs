//! Branch naming for task branches.
//!
//! Names are generated by a text model under a constrained prompt and
//! validated strictly. Any failure falls back to a deterministic name, so
//! naming never blocks a task.

pub mod adapters;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

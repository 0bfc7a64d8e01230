//! Text generator implementations.

pub mod memory;
pub mod openai;

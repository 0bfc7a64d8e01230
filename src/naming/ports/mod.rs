//! Port contracts for branch naming.

mod generator;

#[cfg(test)]
pub use generator::MockTextGenerator;
pub use generator::{TextGenerationError, TextGenerator};

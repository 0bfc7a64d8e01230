//! Text generation port used to propose branch names.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Completes a single prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model's reply to `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`TextGenerationError`] when the model cannot be reached or
    /// replies with nothing usable.
    async fn complete(&self, prompt: &str) -> Result<String, TextGenerationError>;
}

/// Errors returned by text generators.
#[derive(Debug, Clone, Error)]
pub enum TextGenerationError {
    /// The request could not be sent or timed out.
    #[error("text generation request failed: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// The service answered with a non-success status.
    #[error("text generation service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// The reply could not be decoded.
    #[error("invalid text generation response: {0}")]
    Decode(String),

    /// The reply had no content.
    #[error("text generation returned no content")]
    EmptyResponse,
}

impl TextGenerationError {
    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}

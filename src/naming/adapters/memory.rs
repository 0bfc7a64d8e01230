//! Canned text generator.

use crate::naming::ports::{TextGenerationError, TextGenerator};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

/// Generator that replies with a fixed string and records prompts.
#[derive(Debug, Clone)]
pub struct StaticTextGenerator {
    reply: Result<String, TextGenerationError>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl StaticTextGenerator {
    /// Replies with `reply` to every prompt.
    #[must_use]
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Arc::default(),
        }
    }

    /// Fails every prompt with `error`.
    #[must_use]
    pub fn failing(error: TextGenerationError) -> Self {
        Self {
            reply: Err(error),
            prompts: Arc::default(),
        }
    }

    /// Returns every prompt received.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TextGenerator for StaticTextGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, TextGenerationError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_owned());
        self.reply.clone()
    }
}

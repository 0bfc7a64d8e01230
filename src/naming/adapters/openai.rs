//! `OpenAI`-compatible chat completions client.

use crate::credentials::domain::Secret;
use crate::naming::ports::{TextGenerationError, TextGenerator};
use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Longest response body excerpt kept in errors.
const BODY_EXCERPT_CHARS: usize = 200;

/// Connection settings for a chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletionsConfig {
    /// Base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
}

/// Generator backed by any `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleGenerator {
    client: Client,
    config: ChatCompletionsConfig,
    api_key: Secret,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleGenerator {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`TextGenerationError::Transport`] when the HTTP client
    /// cannot be built.
    pub fn new(config: ChatCompletionsConfig, api_key: Secret) -> Result<Self, TextGenerationError> {
        let client = Client::builder()
            .user_agent(concat!("foreman/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(TextGenerationError::transport)?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, TextGenerationError> {
        let body = ChatRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let response = self
            .client
            .post(self.endpoint())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose()),
            )
            .json(&body)
            .send()
            .await
            .map_err(TextGenerationError::transport)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(TextGenerationError::transport)?;
        if !status.is_success() {
            return Err(TextGenerationError::Status {
                status: status.as_u16(),
                body: text.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }
        let decoded: ChatResponse = serde_json::from_str(&text)
            .map_err(|err| TextGenerationError::Decode(err.to_string()))?;
        let content = decoded
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or(TextGenerationError::EmptyResponse)?;
        debug!(model = %self.config.model, "text generation completed");
        Ok(content)
    }
}

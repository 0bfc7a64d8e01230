//! AI branch name generation with deterministic fallback.

use crate::credentials::domain::Secret;
use crate::naming::{
    adapters::openai::{ChatCompletionsConfig, OpenAiCompatibleGenerator},
    ports::{TextGenerationError, TextGenerator},
};
use crate::task::domain::{BranchName, TaskDomainError, TaskId};
use chrono::{DateTime, Utc};
use minijinja::{Environment, context};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

const PROMPT_TEMPLATE: &str = "\
Generate a short git branch name for the following coding task.
Rules:
- use only lowercase letters, digits, hyphens and slashes
- use at most {{ max_length }} characters
- start with a conventional prefix such as feature/, fix/, chore/ or docs/
- reply with the branch name only, without quotes or explanation
Task: {{ description }}
{% if repository %}Repository: {{ repository }}
{% endif %}{% if context %}Context: {{ context }}
{% endif %}";

/// Branch naming configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BranchNamingSettings {
    /// Whether AI generation is attempted at all.
    pub enabled: bool,
    /// Maximum length of the generated name before the suffix.
    pub max_length: usize,
    /// Length of the random suffix.
    pub suffix_length: usize,
    /// Chat completions base URL.
    pub base_url: String,
    /// Model used for generation.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// API key for the chat completions endpoint.
    pub api_key: Option<Secret>,
}

impl Default for BranchNamingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_length: 50,
            suffix_length: 6,
            base_url: "https://api.openai.com/v1".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            timeout_seconds: 10,
            api_key: None,
        }
    }
}

impl BranchNamingSettings {
    /// Returns the chat completions client configuration.
    #[must_use]
    pub fn chat_config(&self) -> ChatCompletionsConfig {
        ChatCompletionsConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: 32,
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }

    /// Builds the namer these settings describe.
    ///
    /// Without an API key, or with generation disabled, the namer only
    /// produces fallback names.
    ///
    /// # Errors
    ///
    /// Returns [`TextGenerationError::Transport`] when the HTTP client
    /// cannot be built.
    pub fn build_namer(&self) -> Result<BranchNamer, TextGenerationError> {
        let generator = match (&self.api_key, self.enabled) {
            (Some(key), true) => {
                let client = OpenAiCompatibleGenerator::new(self.chat_config(), key.clone())?;
                Some(Arc::new(client) as Arc<dyn TextGenerator>)
            }
            _ => None,
        };
        Ok(BranchNamer::new(generator, self.clone()))
    }
}

/// Inputs for one branch name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchRequest<'a> {
    /// Task description, usually the prompt.
    pub description: &'a str,
    /// Repository the branch lives in.
    pub repo_hint: Option<&'a str>,
    /// Extra context for the model.
    pub context_hint: Option<&'a str>,
}

impl<'a> BranchRequest<'a> {
    /// Creates a request with only a description.
    #[must_use]
    pub const fn new(description: &'a str) -> Self {
        Self {
            description,
            repo_hint: None,
            context_hint: None,
        }
    }

    /// Sets the repository hint.
    #[must_use]
    pub const fn with_repo_hint(mut self, repo: &'a str) -> Self {
        self.repo_hint = Some(repo);
        self
    }

    /// Sets the context hint.
    #[must_use]
    pub const fn with_context_hint(mut self, context: &'a str) -> Self {
        self.context_hint = Some(context);
        self
    }
}

/// Reasons the AI path produced no name.
#[derive(Debug, Clone, Error)]
pub enum BranchNamingError {
    /// No generator is configured or generation is disabled.
    #[error("branch name generation is disabled")]
    Disabled,

    /// The prompt template failed to render.
    #[error("failed to render branch prompt: {0}")]
    Template(String),

    /// The generator failed.
    #[error(transparent)]
    Generation(#[from] TextGenerationError),

    /// The generated name broke the naming rules.
    #[error(transparent)]
    Invalid(#[from] TaskDomainError),
}

/// Generates task branch names.
#[derive(Clone)]
pub struct BranchNamer {
    generator: Option<Arc<dyn TextGenerator>>,
    settings: BranchNamingSettings,
}

impl BranchNamer {
    /// Creates a namer. Without a generator every name is a fallback.
    #[must_use]
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, settings: BranchNamingSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// Creates a namer that only produces fallback names.
    #[must_use]
    pub fn fallback_only() -> Self {
        Self::new(None, BranchNamingSettings::default())
    }

    /// Asks the generator for a name and appends a random suffix.
    ///
    /// # Errors
    ///
    /// Returns [`BranchNamingError`] when generation is disabled, fails,
    /// or yields a name outside `[a-z0-9-/]`, with a leading or trailing
    /// separator, containing `//`, or longer than the configured maximum.
    pub async fn generate(&self, request: BranchRequest<'_>) -> Result<BranchName, BranchNamingError> {
        let generator = self
            .generator
            .as_ref()
            .filter(|_| self.settings.enabled)
            .ok_or(BranchNamingError::Disabled)?;
        let prompt = self.render_prompt(request)?;
        let reply = generator.complete(&prompt).await?;
        let candidate = clean_reply(&reply);
        let validated = BranchName::strict(candidate, self.settings.max_length)?;
        let suffix = random_suffix(self.settings.suffix_length);
        Ok(BranchName::new(format!("{validated}-{suffix}"))?)
    }

    /// Returns the deterministic fallback name. Never fails.
    #[must_use]
    pub fn fallback(task_id: &TaskId, at: DateTime<Utc>) -> BranchName {
        BranchName::fallback(task_id, at)
    }

    /// Generates a name, falling back when the AI path fails.
    pub async fn name_or_fallback(
        &self,
        request: BranchRequest<'_>,
        task_id: &TaskId,
        at: DateTime<Utc>,
    ) -> BranchName {
        match self.generate(request).await {
            Ok(name) => {
                debug!(task_id = %task_id, branch = %name, "generated branch name");
                name
            }
            Err(BranchNamingError::Disabled) => Self::fallback(task_id, at),
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "branch name generation failed; using fallback");
                Self::fallback(task_id, at)
            }
        }
    }

    fn render_prompt(&self, request: BranchRequest<'_>) -> Result<String, BranchNamingError> {
        Environment::new()
            .render_str(
                PROMPT_TEMPLATE,
                context! {
                    description => request.description.trim(),
                    repository => request.repo_hint,
                    context => request.context_hint,
                    max_length => self.settings.max_length,
                },
            )
            .map_err(|err| BranchNamingError::Template(err.to_string()))
    }
}

impl fmt::Debug for BranchNamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchNamer")
            .field("has_generator", &self.generator.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Takes the first line and strips surrounding quotes and backticks.
fn clean_reply(reply: &str) -> &str {
    reply
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim()
}

fn random_suffix(length: usize) -> String {
    Uuid::new_v4().simple().to_string().chars().take(length).collect()
}

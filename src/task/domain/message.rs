//! Conversation entries attached to a task.

use super::{MessageId, ParseMessageRoleError, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a task message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Written by the task owner.
    User,
    /// Produced by the agent backend.
    Agent,
    /// Emitted by the engine.
    System,
}

impl MessageRole {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MessageRole {
    type Error = ParseMessageRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "agent" | "assistant" => Ok(Self::Agent),
            "system" => Ok(Self::System),
            _ => Err(ParseMessageRoleError(value.to_owned())),
        }
    }
}

/// An entry in a task's transcript.
///
/// Agent messages are created empty before a run starts and have their
/// content replaced once output is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    id: MessageId,
    task_id: TaskId,
    role: MessageRole,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskMessage {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        role: MessageRole,
        content: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: MessageId::new(),
            task_id,
            role,
            content: content.into(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Returns the author role.
    #[must_use]
    pub const fn role(&self) -> MessageRole {
        self.role
    }

    /// Returns the current content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest content change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces the message content.
    pub fn replace_content(&mut self, content: impl Into<String>, clock: &impl Clock) {
        self.content = content.into();
        self.updated_at = clock.utc();
    }
}

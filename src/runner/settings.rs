//! Task execution defaults.

use crate::agent::domain::Connector;
use crate::task::domain::DEFAULT_MAX_DURATION_MINUTES;
use serde::Deserialize;

/// Most provisioning attempts a run makes: the first plus one retry.
pub const MAX_PROVISION_ATTEMPTS: u32 = 2;

/// Limits and defaults for task runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Duration used when a request does not name one.
    pub default_max_duration_minutes: u32,
    /// Largest duration a request may ask for.
    pub max_duration_limit_minutes: u32,
    /// Provisioning attempts per run, the first one included. Capped at
    /// [`MAX_PROVISION_ATTEMPTS`].
    pub provision_attempts: u32,
    /// Pending run requests the worker buffers.
    pub queue_capacity: usize,
    /// Connectors offered to every agent run.
    pub connectors: Vec<Connector>,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            default_max_duration_minutes: DEFAULT_MAX_DURATION_MINUTES,
            max_duration_limit_minutes: 300,
            provision_attempts: MAX_PROVISION_ATTEMPTS,
            queue_capacity: 64,
            connectors: Vec::new(),
        }
    }
}

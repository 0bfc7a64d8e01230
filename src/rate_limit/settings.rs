//! Quota configuration.

use crate::task::domain::UserId;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Daily quota applied to every user unless overridden.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Requests allowed per UTC day.
    pub daily_limit: u32,
    /// Per-user limits keyed by user identifier.
    pub overrides: BTreeMap<String, u32>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            daily_limit: 20,
            overrides: BTreeMap::new(),
        }
    }
}

impl RateLimitSettings {
    /// Returns the limit that applies to `user`.
    #[must_use]
    pub fn limit_for(&self, user: &UserId) -> u32 {
        self.overrides
            .get(user.as_str())
            .copied()
            .unwrap_or(self.daily_limit)
    }
}

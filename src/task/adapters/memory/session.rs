//! Fixed session identity.

use async_trait::async_trait;

use crate::task::{domain::UserId, ports::SessionIdentity};

/// Session identity that always reports the same user.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user_id: Option<UserId>,
}

impl StaticSession {
    /// Creates a session authenticated as `user_id`.
    #[must_use]
    pub const fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Creates an anonymous session.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }
}

#[async_trait]
impl SessionIdentity for StaticSession {
    async fn current_user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }
}

//! Session lookup port.

use crate::task::domain::UserId;
use async_trait::async_trait;

/// Resolves the user behind the current request.
#[async_trait]
pub trait SessionIdentity: Send + Sync {
    /// Returns the authenticated user, or `None` for anonymous requests.
    async fn current_user_id(&self) -> Option<UserId>;
}

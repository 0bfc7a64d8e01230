//! Per-user daily quota for task creation and follow-up messages.
//!
//! The window is the current UTC calendar day. Tasks created that day,
//! soft-deleted ones included, and user messages sent that day both count
//! against the same limit.

mod limiter;
mod settings;

pub use limiter::{RateLimitError, RateLimitStatus, RateLimiter};
pub use settings::RateLimitSettings;

#[cfg(test)]
mod tests;

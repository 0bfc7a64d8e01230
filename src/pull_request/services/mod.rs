//! Pull-request lifecycle services.

mod lifecycle;

pub use lifecycle::{CreatePullRequest, GitHostingSettings, PullRequestError, PullRequestService};

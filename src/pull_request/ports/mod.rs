//! Port contracts for the git-hosting service.

mod hosting;

pub use hosting::{GitHostingApi, GitHostingError, GitHostingResult};

//! Pull-request lifecycle for task branches.
//!
//! Creates, merges, closes, reopens and synchronises the pull request of a
//! task and discovers preview deployments from check runs. The git-hosting
//! token is resolved per user and never stored on the task.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

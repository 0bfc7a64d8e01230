//! Domain model for sandbox lifecycle management.

mod command;
mod error;
mod package_manager;
mod spec;

pub use command::{CommandOutput, CommandRequest, shell_quote};
pub use error::SandboxError;
pub use package_manager::PackageManager;
pub use spec::{RemoteSandbox, ResourceSpec, SandboxSpec};

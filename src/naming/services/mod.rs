//! Branch naming services.

mod namer;

pub use namer::{BranchNamer, BranchNamingError, BranchNamingSettings, BranchRequest};

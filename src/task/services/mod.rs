//! Application services for task control.

mod control;

pub use control::{CreateTaskRequest, TaskControlError, TaskControlResult, TaskControlService};

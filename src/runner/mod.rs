//! Background execution of tasks.
//!
//! [`TaskRunner`] drives one task from `PENDING` to a terminal state:
//! credentials, branch naming, sandbox provisioning, dependency
//! installation, agent execution and commit/push, with cooperative
//! cancellation checkpoints between steps. [`TaskWorker`] feeds run
//! requests from a channel to independent Tokio tasks.

mod cancellation;
mod error;
mod logger;
mod service;
mod settings;
mod worker;

pub use cancellation::StoredCancellation;
pub use error::RunnerError;
pub use logger::{REDACTED, Redactor, TaskLogger};
pub use service::TaskRunner;
pub use settings::{MAX_PROVISION_ATTEMPTS, TaskSettings};
pub use worker::{
    ChannelDispatcher, DispatchError, RunKind, RunRequest, TaskDispatcher, TaskWorker,
    WorkerHandle,
};

#[cfg(test)]
pub use worker::MockTaskDispatcher;

#[cfg(test)]
mod tests;

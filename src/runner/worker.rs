//! Channel-fed background worker.

use super::TaskRunner;
use crate::sandbox::ports::SandboxProvider;
use crate::task::{
    domain::{TaskId, UserId},
    ports::TaskStore,
};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{error, info, warn};

/// What a run request asks the runner to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunKind {
    /// Start a pending task.
    Initial,
    /// Run another agent turn on a finished keep-alive task.
    FollowUp {
        /// Instruction for the agent.
        instruction: String,
    },
}

/// A unit of work for the background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Task to run.
    pub task_id: TaskId,
    /// Owner the task is loaded for.
    pub owner: UserId,
    /// Initial run or follow-up.
    pub kind: RunKind,
}

impl RunRequest {
    /// Requests the initial run of a task.
    #[must_use]
    pub const fn initial(task_id: TaskId, owner: UserId) -> Self {
        Self {
            task_id,
            owner,
            kind: RunKind::Initial,
        }
    }

    /// Requests a follow-up turn.
    #[must_use]
    pub fn follow_up(task_id: TaskId, owner: UserId, instruction: impl Into<String>) -> Self {
        Self {
            task_id,
            owner,
            kind: RunKind::FollowUp {
                instruction: instruction.into(),
            },
        }
    }
}

/// Errors returned when a run cannot be queued.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The worker has shut down.
    #[error("task worker is not running")]
    Closed,
}

/// Hands run requests to whatever executes them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Queues `request`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] when nothing will execute it.
    async fn dispatch(&self, request: RunRequest) -> Result<(), DispatchError>;
}

enum WorkerCommand {
    Run(RunRequest),
    Shutdown,
}

/// Dispatcher that sends requests to a running [`TaskWorker`].
#[derive(Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<WorkerCommand>,
}

#[async_trait]
impl TaskDispatcher for ChannelDispatcher {
    async fn dispatch(&self, request: RunRequest) -> Result<(), DispatchError> {
        self.sender
            .send(WorkerCommand::Run(request))
            .await
            .map_err(|_| DispatchError::Closed)
    }
}

/// Handle to a running worker.
pub struct WorkerHandle {
    sender: mpsc::Sender<WorkerCommand>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Returns a dispatcher feeding this worker.
    #[must_use]
    pub fn dispatcher(&self) -> ChannelDispatcher {
        ChannelDispatcher {
            sender: self.sender.clone(),
        }
    }

    /// Stops accepting requests and waits for in-flight runs to finish.
    pub async fn shutdown(self) {
        if self.sender.send(WorkerCommand::Shutdown).await.is_err() {
            warn!("task worker already stopped");
        }
        if let Err(err) = self.join.await {
            error!(error = %err, "task worker terminated abnormally");
        }
    }
}

/// Spawns one Tokio task per run request.
pub struct TaskWorker;

impl TaskWorker {
    /// Starts the worker loop on the current Tokio runtime.
    #[must_use]
    pub fn start<S, P, C>(runner: Arc<TaskRunner<S, P, C>>, capacity: usize) -> WorkerHandle
    where
        S: TaskStore + 'static,
        P: SandboxProvider + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let join = tokio::spawn(run_loop(runner, receiver));
        WorkerHandle { sender, join }
    }
}

async fn run_loop<S, P, C>(
    runner: Arc<TaskRunner<S, P, C>>,
    mut receiver: mpsc::Receiver<WorkerCommand>,
) where
    S: TaskStore + 'static,
    P: SandboxProvider + 'static,
    C: Clock + Send + Sync + 'static,
{
    let mut in_flight = JoinSet::new();
    info!("task worker started");
    loop {
        tokio::select! {
            command = receiver.recv() => match command {
                Some(WorkerCommand::Run(request)) => {
                    let task_runner = Arc::clone(&runner);
                    in_flight.spawn(async move { execute(&task_runner, request).await });
                }
                Some(WorkerCommand::Shutdown) | None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => reap(joined),
        }
    }

    receiver.close();
    info!(in_flight = in_flight.len(), "task worker draining");
    while let Some(joined) = in_flight.join_next().await {
        reap(joined);
    }
    info!("task worker stopped");
}

async fn execute<S, P, C>(runner: &TaskRunner<S, P, C>, request: RunRequest)
where
    S: TaskStore + 'static,
    P: SandboxProvider + 'static,
    C: Clock + Send + Sync + 'static,
{
    let RunRequest {
        task_id,
        owner,
        kind,
    } = request;
    match kind {
        RunKind::Initial => match runner.run(&task_id, &owner).await {
            Ok(status) => info!(task_id = %task_id, status = %status, "task run finished"),
            Err(err) => error!(task_id = %task_id, error = %err, "task run failed"),
        },
        RunKind::FollowUp { instruction } => {
            match runner.follow_up(&task_id, &owner, &instruction).await {
                Ok(result) => info!(
                    task_id = %task_id,
                    success = result.success,
                    changes_detected = result.changes_detected,
                    "follow-up finished"
                ),
                Err(err) => error!(task_id = %task_id, error = %err, "follow-up failed"),
            }
        }
    }
}

fn reap(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        error!(error = %err, "task run panicked");
    }
}

//! Scriptable in-memory sandbox provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::sandbox::{
    domain::{CommandOutput, CommandRequest, RemoteSandbox, SandboxSpec},
    ports::{SandboxProvider, SandboxProviderError, SandboxProviderResult},
};

/// Working directory reported for every in-memory sandbox.
pub const IN_MEMORY_WORKDIR: &str = "/vercel/sandbox";

/// A command observed by the in-memory provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    /// Sandbox the command ran in.
    pub sandbox_id: String,
    /// The command as received, environment included.
    pub request: CommandRequest,
}

/// In-memory provider that records commands and replays scripted outputs.
///
/// Commands with no matching script succeed with empty output. Scripts are
/// matched by substring against the rendered command line; the most
/// recently added match wins.
#[derive(Debug, Clone, Default)]
pub struct InMemorySandboxProvider {
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Debug, Default)]
struct ProviderState {
    sandboxes: HashMap<String, SandboxRecord>,
    created: Vec<SandboxSpec>,
    commands: Vec<RecordedCommand>,
    scripts: Vec<(String, CommandOutput)>,
    failing_creates: u32,
    failing_stops: bool,
    next_id: u32,
}

#[derive(Debug, Clone)]
struct SandboxRecord {
    remote: RemoteSandbox,
    stopped: bool,
}

impl InMemorySandboxProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` create calls fail with a timeout.
    pub fn fail_next_creates(&self, count: u32) {
        self.with_state(|state| state.failing_creates = count);
    }

    /// Makes every stop call fail.
    pub fn fail_stops(&self) {
        self.with_state(|state| state.failing_stops = true);
    }

    /// Replays `output` for commands whose rendered line contains `pattern`.
    pub fn script(&self, pattern: impl Into<String>, output: CommandOutput) {
        let entry = (pattern.into(), output);
        self.with_state(|state| state.scripts.push(entry));
    }

    /// Returns the specs of every successful create call.
    #[must_use]
    pub fn created(&self) -> Vec<SandboxSpec> {
        self.with_state(|state| state.created.clone())
    }

    /// Returns every command received, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.with_state(|state| state.commands.clone())
    }

    /// Returns `true` when any received command line contains `pattern`.
    #[must_use]
    pub fn ran(&self, pattern: &str) -> bool {
        self.commands()
            .iter()
            .any(|command| command.request.render().contains(pattern))
    }

    /// Returns `true` when the sandbox exists and has been stopped.
    #[must_use]
    pub fn is_stopped(&self, sandbox_id: &str) -> bool {
        self.with_state(|state| {
            state
                .sandboxes
                .get(sandbox_id)
                .is_some_and(|record| record.stopped)
        })
    }

    /// Adds a running sandbox as if created by another process.
    pub fn seed(&self, sandbox_id: impl Into<String>) -> RemoteSandbox {
        let remote = RemoteSandbox {
            sandbox_id: sandbox_id.into(),
            workdir: IN_MEMORY_WORKDIR.to_owned(),
        };
        let record = SandboxRecord {
            remote: remote.clone(),
            stopped: false,
        };
        self.with_state(|state| {
            state
                .sandboxes
                .insert(record.remote.sandbox_id.clone(), record);
        });
        remote
    }

    fn with_state<T>(&self, action: impl FnOnce(&mut ProviderState) -> T) -> T {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        action(&mut state)
    }
}

#[async_trait]
impl SandboxProvider for InMemorySandboxProvider {
    async fn create(&self, spec: &SandboxSpec) -> SandboxProviderResult<RemoteSandbox> {
        self.with_state(|state| {
            if state.failing_creates > 0 {
                state.failing_creates -= 1;
                return Err(SandboxProviderError::Timeout(
                    "sandbox creation timed out".to_owned(),
                ));
            }
            state.next_id += 1;
            let remote = RemoteSandbox {
                sandbox_id: format!("sbx-{}", state.next_id),
                workdir: IN_MEMORY_WORKDIR.to_owned(),
            };
            state.sandboxes.insert(
                remote.sandbox_id.clone(),
                SandboxRecord {
                    remote: remote.clone(),
                    stopped: false,
                },
            );
            state.created.push(spec.clone());
            Ok(remote)
        })
    }

    async fn get(&self, sandbox_id: &str) -> SandboxProviderResult<RemoteSandbox> {
        self.with_state(|state| {
            state
                .sandboxes
                .get(sandbox_id)
                .filter(|record| !record.stopped)
                .map(|record| record.remote.clone())
                .ok_or_else(|| SandboxProviderError::NotFound(sandbox_id.to_owned()))
        })
    }

    async fn run_command(
        &self,
        sandbox: &RemoteSandbox,
        request: &CommandRequest,
    ) -> SandboxProviderResult<CommandOutput> {
        self.with_state(|state| {
            let running = state
                .sandboxes
                .get(&sandbox.sandbox_id)
                .is_some_and(|record| !record.stopped);
            if !running {
                return Err(SandboxProviderError::NotFound(sandbox.sandbox_id.clone()));
            }
            state.commands.push(RecordedCommand {
                sandbox_id: sandbox.sandbox_id.clone(),
                request: request.clone(),
            });
            let rendered = request.render();
            Ok(state
                .scripts
                .iter()
                .rev()
                .find(|(pattern, _)| rendered.contains(pattern.as_str()))
                .map(|(_, output)| output.clone())
                .unwrap_or_default())
        })
    }

    async fn stop(&self, sandbox: &RemoteSandbox) -> SandboxProviderResult<()> {
        self.with_state(|state| {
            if let Some(record) = state.sandboxes.get_mut(&sandbox.sandbox_id) {
                record.stopped = true;
            }
            if state.failing_stops {
                return Err(SandboxProviderError::Timeout("stop timed out".to_owned()));
            }
            Ok(())
        })
    }

    async fn domain(&self, sandbox: &RemoteSandbox, port: u16) -> SandboxProviderResult<String> {
        Ok(format!("https://{}-{port}.sandbox.test", sandbox.sandbox_id))
    }
}

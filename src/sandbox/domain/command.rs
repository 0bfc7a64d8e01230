//! Commands executed inside a sandbox.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A command to run in the sandbox working directory.
///
/// # Examples
///
///     use foreman::sandbox::domain::CommandRequest;
///
///     let request = CommandRequest::new("git").with_args(["commit", "-m", "it's done"]);
///     assert_eq!(request.render(), "git commit -m 'it'\\''s done'");
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<String>,
}

impl CommandRequest {
    /// Creates a request for `command` with no arguments.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Creates a request that runs `script` through `sh -c`.
    #[must_use]
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").with_args(["-c".to_owned(), script.into()])
    }

    /// Replaces the argument list.
    #[must_use]
    pub fn with_args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = values.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Merges `base` beneath the request's own variables.
    #[must_use]
    pub fn with_base_env(mut self, base: &BTreeMap<String, String>) -> Self {
        for (key, value) in base {
            self.env.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self
    }

    /// Sets the working directory unless one is already set.
    #[must_use]
    pub fn with_default_cwd(mut self, cwd: &str) -> Self {
        if self.cwd.is_none() {
            self.cwd = Some(cwd.to_owned());
        }
        self
    }

    /// Returns the executable.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the environment variables.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Returns the working directory.
    #[must_use]
    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    /// Renders the command line for logs. Environment values are omitted.
    #[must_use]
    pub fn render(&self) -> String {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().map(|arg| render_arg(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn render_arg(value: &str) -> String {
    let is_plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+,".contains(c));
    if is_plain {
        value.to_owned()
    } else {
        shell_quote(value)
    }
}

/// Wraps `value` in single quotes for a POSIX shell line.
///
/// An embedded quote closes the string, emits an escaped quote and reopens.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Captured result of a sandbox command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Process exit code.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Creates a successful output with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Creates a failed output.
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns `true` for a zero exit code.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

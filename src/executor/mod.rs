//! Command execution abstraction for dsinstance.
//!
//! Every host mutation the provisioner performs (account creation, instance
//! setup, SSL setup, LDIF apply, service control) goes through a
//! [`CommandExecutor`], so tests can substitute a recording fake.
//!
//! This module provides:
//! - [`CommandSpec`]: Specification for commands to execute
//! - [`ExecutionResult`]: Result of command execution
//! - [`CommandExecutor`]: Trait for command execution strategies
//! - [`RealCommandExecutor`]: Production implementation using `std::process::Command`

mod pipe;
mod real;

use std::ffi::OsString;
use std::fmt;
use std::process::ExitStatus;

use anyhow::Result;

use crate::error::DsInstanceError;

pub use real::RealCommandExecutor;

const REDACTED: &str = "********";

/// Specification for a command to be executed.
///
/// Registered secrets are masked wherever they occur in the arguments, in
/// `Debug` output, [`CommandSpec::display`] and captured tool output.
#[derive(Clone)]
pub struct CommandSpec {
    /// The command to execute (absolute path or a name looked up in `PATH`)
    pub command: String,
    /// Command arguments
    pub args: Vec<OsString>,
    secrets: Vec<String>,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            secrets: Vec::new(),
        }
    }

    /// Marks `value` as secret so it never shows up in logs or error messages.
    #[must_use]
    pub fn with_secret(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value);
        }
        self
    }

    /// Replaces every occurrence of a registered secret in `text` with a mask.
    pub fn redact(&self, text: &str) -> String {
        redact_secrets(text, &self.secrets)
    }

    /// Arguments with secrets replaced by a mask.
    pub fn redacted_args(&self) -> Vec<String> {
        self.args.iter().map(|a| self.redact(&a.to_string_lossy())).collect()
    }

    /// Formats the command line for logs and errors, e.g.
    /// `/usr/bin/ldapmodify "-xv" "-w" "********"`.
    pub fn display(&self) -> String {
        let args = format_command_args(&self.redacted_args());
        if args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, args)
        }
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.command)
            .field("args", &self.redacted_args())
            .finish()
    }
}

/// Masks each secret in `text`, longest first so overlapping secrets are
/// masked completely.
pub(crate) fn redact_secrets(text: &str, secrets: &[String]) -> String {
    let mut sorted: Vec<&str> = secrets.iter().map(String::as_str).collect();
    sorted.sort_by_key(|s| std::cmp::Reverse(s.len()));
    sorted
        .into_iter()
        .fold(text.to_string(), |acc, secret| acc.replace(secret, REDACTED))
}

/// Formats string arguments into a space-separated, debug-quoted string.
pub(crate) fn format_command_args(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of command execution
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Exit status of the command (None in dry-run mode)
    pub status: Option<ExitStatus>,
    /// Last lines the command wrote to stderr, oldest first.
    pub stderr_tail: Vec<String>,
}

impl ExecutionResult {
    /// Returns true if the command executed successfully.
    ///
    /// In dry-run mode (status is None), this always returns true.
    pub fn success(&self) -> bool {
        self.status.is_none_or(|s| s.success())
    }

    /// Returns the exit code if available
    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }

    /// Converts an unsuccessful result into a [`DsInstanceError::Execution`].
    pub fn check(self, spec: &CommandSpec) -> Result<Self, DsInstanceError> {
        if self.success() {
            return Ok(self);
        }
        let mut status = self
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown (no status available)".to_string());
        if !self.stderr_tail.is_empty() {
            status.push_str("; stderr: ");
            status.push_str(&spec.redact(&self.stderr_tail.join(" | ")));
        }
        Err(DsInstanceError::Execution {
            command: spec.display(),
            status,
        })
    }
}

/// Trait for command execution.
///
/// Execution is synchronous: `execute` returns once the child has exited.
/// There is no timeout, a hung tool blocks the caller.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command with the given specification.
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult>;
}

/// Runs `spec` and fails unless it exits successfully.
pub fn run_checked(executor: &dyn CommandExecutor, spec: &CommandSpec) -> Result<ExecutionResult> {
    let result = executor.execute(spec)?;
    Ok(result.check(spec)?)
}

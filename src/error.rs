//! Domain-specific error types for dsinstance.
//!
//! This module defines `DsInstanceError`, a `thiserror`-based enum that
//! provides typed error variants for the failure modes of provisioning.
//! Leaf functions return `Result<T, DsInstanceError>`, while the
//! orchestration layer and the executor trait use `anyhow::Result` and add
//! step context on top.
//!
//! `DsInstanceError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically, and callers can still `downcast_ref` to it.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Common kinds get a short fixed message (e.g. "I/O error: not found")
/// instead of the OS-level text. Unrecognized kinds fall back to the
/// OS-level message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        io::ErrorKind::AlreadyExists => "I/O error: already exists".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for dsinstance.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DsInstanceError {
    /// An operation was attempted before its inputs exist, e.g. asking for
    /// the instance config directory before a server id was generated.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Caller-supplied input was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// An external tool failed (non-zero exit, spawn failure, wait failure, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command line that was executed, with secrets redacted.
        command: String,
        /// Exit status, signal information or internal failure reason,
        /// followed by the trailing stderr output when there was any.
        status: String,
    },

    /// A template referenced a placeholder that could not be substituted.
    #[error("template error in {template}: {reason}")]
    Template {
        /// Name or path of the template being rendered.
        template: String,
        /// The offending placeholder, or a description of the malformed `$`.
        reason: String,
    },

    /// The settings file could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred, usually including a path.
        context: String,
        /// Derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl DsInstanceError {
    /// Creates an `Io` variant with the `message` field derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }
}

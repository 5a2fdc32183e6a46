//! Error types for solo operations.
//!
//! Collaborator-level I/O failures are converted into this taxonomy at the
//! boundary of each supervisor operation; nothing below the CLI reports a
//! raw OS error uncategorized.

use thiserror::Error;

/// Result type alias for solo operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Main error type for solo operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Invalid user input (bad name, bad numeric option, empty command).
    /// Surfaced before any side effect; never retried.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// No registry record exists for the given name.
    #[error("no process tracked under name '{name}'")]
    NotTracked { name: String },

    /// OS process creation failed. No registry record is written in this
    /// case, so tracking state stays consistent.
    #[error("failed to spawn '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },

    /// The process survived the full termination escalation.
    #[error("failed to kill '{name}' (pid {pid}): process still alive after escalation")]
    KillFailed { name: String, pid: u32 },

    /// An operation exhausted its wait window.
    #[error("timed out waiting for '{name}' ({operation})")]
    Timeout { name: String, operation: String },

    /// A registry write or delete that was supposed to persist state failed.
    #[error("registry error for '{name}': {reason}")]
    Registry { name: String, reason: String },

    /// Signal delivery failed for a reason other than the process being gone.
    #[error("signal delivery failed for pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    /// Uncategorized I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_tracked(name: impl Into<String>) -> Self {
        Self::NotTracked { name: name.into() }
    }

    pub fn spawn_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn kill_failed(name: impl Into<String>, pid: u32) -> Self {
        Self::KillFailed {
            name: name.into(),
            pid,
        }
    }

    pub fn timeout(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Timeout {
            name: name.into(),
            operation: operation.into(),
        }
    }

    pub fn registry(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Registry {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn signal(pid: u32, reason: impl Into<String>) -> Self {
        Self::Signal {
            pid,
            reason: reason.into(),
        }
    }
}

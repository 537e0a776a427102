//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the supervision core expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `sysinfo`/`nix` types in any signature
//! - Intent-based methods for the process port (not implementation-leaking)
//! - Authorization stays upstream; the core only sees a decision

pub mod auth;
pub mod process;

use thiserror::Error;

pub use auth::{AuthDecision, Authorizer};
pub use process::{Discovery, LaunchSpec, ProcessHandle, ProcessPort, reconcile};

/// Domain-specific errors for process port operations.
///
/// This error type abstracts away process management implementation details
/// and provides a clean interface for the drivers to handle process failures.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Failed to spawn the process.
    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    /// Failed to deliver the kill signal.
    #[error("failed to kill process {pid}: {reason}")]
    KillFailed { pid: u32, reason: String },

    /// The process did not exit within the configured wait deadline.
    #[error("process {pid} did not exit within the wait deadline")]
    WaitTimedOut { pid: u32 },

    /// The operation is not available on this platform.
    #[error("operation not supported on this platform: {0}")]
    Unsupported(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Canonical error type for supervision operations.
///
/// Adapters map this to their own surface (HTTP status codes, CLI exit
/// codes). Only the message and the optional cause chain cross the
/// boundary; no stack traces.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A required path is missing or a config value is unusable. Fatal:
    /// raised at construction, the supervisor never becomes serviceable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A requested track/variant selection is not in the catalog.
    /// Rejected before any file is touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested transition is not legal in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Spawn/kill/wait/file-I/O failure or backup-lock timeout,
    /// wrapping the underlying cause when one exists.
    #[error("{message}")]
    Operation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl ControlError {
    /// Operational error without an underlying cause.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
            source: None,
        }
    }

    /// Operational error wrapping an underlying cause.
    pub fn operation_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Operation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<ProcessError> for ControlError {
    fn from(err: ProcessError) -> Self {
        Self::operation_with("server process operation failed", err)
    }
}

//! Process port trait definition and handle reconciliation.
//!
//! OS process identity has no persistence: after a control-plane restart
//! the only way back to a running server is a process-table lookup by
//! name. Reconciliation over such a snapshot is a pure function here so
//! the policy is deterministic and unit-testable with a fake table.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ProcessError;

/// Handle to an OS process observed at the last refresh.
///
/// Never persisted, and never trusted without re-querying liveness
/// through the port first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessHandle {
    /// OS-assigned process id.
    pub pid: u32,
    /// Process name the handle was discovered or spawned under.
    pub name: String,
}

impl ProcessHandle {
    /// Create a new process handle.
    #[must_use]
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

/// Launch specification for spawning a server process.
///
/// Intent-based: expresses what the caller wants started, not how the
/// platform starts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Absolute path to the executable.
    pub executable: PathBuf,
    /// Working directory for the process.
    pub working_dir: PathBuf,
    /// Launch arguments, already split.
    pub args: Vec<String>,
}

/// Result of reconciling a process-table snapshot against a process name.
///
/// The ambiguous case is surfaced explicitly instead of silently picking
/// an index; the caller applies a named adoption policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// No process with the name exists.
    None,
    /// Exactly one match.
    Single(ProcessHandle),
    /// More than one match, in snapshot order.
    Ambiguous(Vec<ProcessHandle>),
}

/// Reconcile a process-table snapshot into a discovery result.
///
/// Pure over the snapshot: given the same table this always returns the
/// same answer, which is what makes driver adoption testable without a
/// real process table.
#[must_use]
pub fn reconcile(snapshot: Vec<ProcessHandle>) -> Discovery {
    let mut matches = snapshot;
    match matches.len() {
        0 => Discovery::None,
        1 => Discovery::Single(matches.remove(0)),
        _ => Discovery::Ambiguous(matches),
    }
}

/// Process port for supervising external server processes.
///
/// This trait abstracts the process table and process lifecycle for
/// testability and alternative backends.
///
/// # Design Rules
///
/// - Liveness is always a fresh query, never a cached answer
/// - `kill_and_wait` is a hard kill with no grace period; the wait is a
///   suspension point and must not block the calling thread
#[async_trait]
pub trait ProcessPort: Send + Sync {
    /// Snapshot of all processes whose name matches exactly, on the local
    /// host, in snapshot order.
    async fn snapshot_by_name(&self, process_name: &str) -> Vec<ProcessHandle>;

    /// Re-query whether the process behind the handle is still alive.
    async fn is_alive(&self, handle: &ProcessHandle) -> bool;

    /// Create and start a new process with no shell indirection and no
    /// visible window. Returns a handle carrying the assigned pid.
    async fn spawn(&self, spec: &LaunchSpec) -> Result<ProcessHandle, ProcessError>;

    /// Send an immediate hard-kill signal and wait for confirmed exit.
    ///
    /// Implementations may bound the wait with a deadline; the default
    /// runtime waits unbounded.
    async fn kill_and_wait(&self, handle: &ProcessHandle) -> Result<(), ProcessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(pid: u32) -> ProcessHandle {
        ProcessHandle::new(pid, "srv")
    }

    #[test]
    fn empty_snapshot_reconciles_to_none() {
        assert_eq!(reconcile(vec![]), Discovery::None);
    }

    #[test]
    fn single_match_is_adopted_as_is() {
        assert_eq!(
            reconcile(vec![handle(42)]),
            Discovery::Single(handle(42))
        );
    }

    #[test]
    fn multiple_matches_surface_as_ambiguous_in_snapshot_order() {
        let result = reconcile(vec![handle(7), handle(3), handle(9)]);
        assert_eq!(
            result,
            Discovery::Ambiguous(vec![handle(7), handle(3), handle(9)])
        );
    }
}

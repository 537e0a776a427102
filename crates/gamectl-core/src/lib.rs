//! Core domain types, port definitions and supervision services for
//! gamectl, a single-host control plane for external game-server
//! processes.
//!
//! The crate is transport-free: HTTP routing, payload shapes and
//! request authentication live in adapters. What lives here is the
//! supervision logic itself: the driver state machine, track discovery
//! and config patching, the pre-stop world backup, and the ports those
//! services consume.

pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use config::{ServerConfig, TrackServerConfig, WorldServerConfig};
pub use domain::TrackSelection;
pub use ports::{
    AuthDecision, Authorizer, ControlError, Discovery, LaunchSpec, ProcessError, ProcessHandle,
    ProcessPort, reconcile,
};
pub use services::{
    BackupCoordinator, CYCLE_DIRS, ConfigPatcher, GenericSupervisor, RESERVED_VARIANT_DIR,
    ServerDriver, StopHook, TRACK_TAG, TrackCatalog, TrackSupervisor, VARIANT_TAG, WorldSupervisor,
};

//! OS-level runtime for gamectl: the process-port implementation that
//! the supervision core drives.
//!
//! Everything platform-specific lives here: `sysinfo` process-table
//! snapshots, `tokio::process` spawning, and Unix signal delivery for
//! processes adopted by name.

mod process;
mod signal;

// Re-export the process port implementation
pub use process::OsProcessPort;

//! Supervision services - the control plane's business logic layer.
//!
//! Services orchestrate between ports (trait interfaces) and domain
//! logic. They never touch `sysinfo`/`nix` directly; the process port
//! hides the platform.

mod backup;
mod driver;
mod patcher;
mod supervisor;
mod tracks;

pub use backup::{BackupCoordinator, CYCLE_DIRS};
pub use driver::{ServerDriver, StopHook};
pub use patcher::{ConfigPatcher, TRACK_TAG, VARIANT_TAG};
pub use supervisor::{GenericSupervisor, TrackSupervisor, WorldSupervisor};
pub use tracks::{RESERVED_VARIANT_DIR, TrackCatalog};

//! Per-kind server configuration records.
//!
//! Records are deserialized by the host (loading itself is not a core
//! concern), immutable afterwards, and validated against the filesystem
//! exactly once when a supervisor is constructed. A missing path is fatal:
//! a misconfigured supervisor never accepts a request.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ports::ControlError;

/// Common configuration shared by every server kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server installation root directory.
    pub root_dir: PathBuf,
    /// Executable path, relative to `root_dir`.
    pub executable: PathBuf,
    /// Process name used for process-table lookup by name.
    pub process_name: String,
    /// Launch arguments, already split.
    #[serde(default)]
    pub launch_arguments: Vec<String>,
}

impl ServerConfig {
    /// Absolute path to the server executable.
    #[must_use]
    pub fn executable_path(&self) -> PathBuf {
        self.root_dir.join(&self.executable)
    }

    /// Validate the record against the filesystem.
    pub fn validate(&self) -> Result<(), ControlError> {
        require_dir(&self.root_dir, "server root directory")?;
        require_file(&self.executable_path(), "server executable")?;
        if self.process_name.is_empty() {
            return Err(ControlError::Configuration(
                "server process name is empty".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the track-selecting server kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackServerConfig {
    /// Common server configuration.
    #[serde(flatten)]
    pub server: ServerConfig,
    /// Directory containing all track directories, relative to the root.
    pub tracks_dir: PathBuf,
    /// Generated text configuration file, relative to the root.
    pub config_file: PathBuf,
}

impl TrackServerConfig {
    /// Absolute path to the tracks directory.
    #[must_use]
    pub fn tracks_path(&self) -> PathBuf {
        self.server.root_dir.join(&self.tracks_dir)
    }

    /// Absolute path to the server configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.server.root_dir.join(&self.config_file)
    }

    /// Validate the record against the filesystem.
    pub fn validate(&self) -> Result<(), ControlError> {
        self.server.validate()?;
        require_dir(&self.tracks_path(), "tracks directory")?;
        require_file(&self.config_path(), "server configuration file")?;
        Ok(())
    }
}

/// Configuration for the world-stateful server kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldServerConfig {
    /// Common server configuration.
    #[serde(flatten)]
    pub server: ServerConfig,
    /// Directory holding the mutable world files. Absolute: world state
    /// commonly lives outside the installation root.
    pub world_dir: PathBuf,
    /// Directory receiving backup cycles. Created on demand.
    pub backup_dir: PathBuf,
    /// Whether world files are snapshotted before every stop.
    pub backup_enabled: bool,
}

impl WorldServerConfig {
    /// Validate the record against the filesystem.
    pub fn validate(&self) -> Result<(), ControlError> {
        self.server.validate()?;
        if self.backup_enabled {
            require_dir(&self.world_dir, "server world directory")?;
        }
        Ok(())
    }
}

fn require_dir(path: &Path, what: &str) -> Result<(), ControlError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ControlError::Configuration(format!(
            "{what} not located: {}",
            path.display()
        )))
    }
}

fn require_file(path: &Path, what: &str) -> Result<(), ControlError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ControlError::Configuration(format!(
            "{what} not located: {}",
            path.display()
        )))
    }
}

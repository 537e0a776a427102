//! Dual-cycle world backup, run immediately before a stateful stop.
//!
//! The server offers no flush or quiesce signal, so a single copy can
//! catch a mid-write moment. Two time-separated cycles raise the odds
//! that at least one snapshot is consistent. This is a mitigation, not a
//! correctness guarantee.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::ports::ControlError;
use crate::services::driver::StopHook;

/// Cycle directory names created under the backup directory.
pub const CYCLE_DIRS: [&str; 2] = ["cycle_1", "cycle_2"];

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_CYCLE_DELAY: Duration = Duration::from_secs(5);

/// Coordinates the pre-stop world snapshot.
///
/// Cloning shares the exclusion token, so every clone participates in the
/// same bounded mutual exclusion. The token is released on every exit
/// path; a failure mid-copy never blocks future stop attempts.
#[derive(Clone)]
pub struct BackupCoordinator {
    world_dir: PathBuf,
    backup_dir: PathBuf,
    token: Arc<Mutex<()>>,
    lock_timeout: Duration,
    cycle_delay: Duration,
}

impl BackupCoordinator {
    /// Create a coordinator copying from `world_dir` into cycle
    /// directories under `backup_dir`.
    pub fn new(world_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            world_dir: world_dir.into(),
            backup_dir: backup_dir.into(),
            token: Arc::new(Mutex::new(())),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            cycle_delay: DEFAULT_CYCLE_DELAY,
        }
    }

    /// Override the bounded wait for the exclusion token.
    #[must_use]
    pub const fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Override the fixed delay between the two copy cycles.
    #[must_use]
    pub const fn with_cycle_delay(mut self, cycle_delay: Duration) -> Self {
        self.cycle_delay = cycle_delay;
        self
    }

    /// Run both backup cycles.
    ///
    /// Fails fast with "backup already in progress" when the token cannot
    /// be acquired within the bound; the caller must abort its stop and
    /// retry later. The file list is enumerated once: files created after
    /// enumeration appear in neither cycle. A copy failure aborts the
    /// whole backup, leaving already-copied files in place.
    pub async fn run(&self) -> Result<(), ControlError> {
        let Ok(_token) = timeout(self.lock_timeout, self.token.lock()).await else {
            return Err(ControlError::operation("backup already in progress"));
        };

        if !self.world_dir.is_dir() {
            return Err(ControlError::Configuration(format!(
                "server world directory not located: {}",
                self.world_dir.display()
            )));
        }

        let cycles = CYCLE_DIRS.map(|name| self.backup_dir.join(name));
        for cycle in &cycles {
            tokio::fs::create_dir_all(cycle).await.map_err(|e| {
                ControlError::operation_with(
                    format!("failed to create backup directory {}", cycle.display()),
                    e,
                )
            })?;
        }

        let files = enumerate_files(&self.world_dir).await?;
        info!(files = files.len(), "starting world backup");

        copy_all(&files, &cycles[0]).await?;
        sleep(self.cycle_delay).await;
        copy_all(&files, &cycles[1]).await?;

        info!("world backup complete");
        Ok(())
    }
}

#[async_trait]
impl StopHook for BackupCoordinator {
    async fn before_stop(&self) -> Result<(), ControlError> {
        self.run().await
    }
}

/// Files directly inside the world directory, captured in one pass.
async fn enumerate_files(dir: &Path) -> Result<Vec<PathBuf>, ControlError> {
    let mut reader = tokio::fs::read_dir(dir).await.map_err(|e| {
        ControlError::operation_with(format!("failed to enumerate {}", dir.display()), e)
    })?;

    let mut files = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(|e| {
        ControlError::operation_with(format!("failed to enumerate {}", dir.display()), e)
    })? {
        let file_type = entry.file_type().await.map_err(|e| {
            ControlError::operation_with(format!("failed to enumerate {}", dir.display()), e)
        })?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

async fn copy_all(files: &[PathBuf], cycle: &Path) -> Result<(), ControlError> {
    for file in files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let target = cycle.join(name);
        debug!(from = %file.display(), to = %target.display(), "copying world file");
        tokio::fs::copy(file, &target).await.map_err(|e| {
            ControlError::operation_with(
                format!("failed to copy {} to {}", file.display(), target.display()),
                e,
            )
        })?;
    }
    Ok(())
}

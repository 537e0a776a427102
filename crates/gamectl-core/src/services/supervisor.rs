//! Supervisor façades, one per server kind.
//!
//! A supervisor composes the process port, the driver state machine and
//! the kind-specific pieces (track catalog + config patcher, or backup
//! coordinator). The transport adapter talks to these and nothing else.

use std::sync::Arc;

use crate::config::{ServerConfig, TrackServerConfig, WorldServerConfig};
use crate::domain::TrackSelection;
use crate::ports::{ControlError, ProcessHandle, ProcessPort};
use crate::services::backup::BackupCoordinator;
use crate::services::driver::ServerDriver;
use crate::services::patcher::ConfigPatcher;
use crate::services::tracks::TrackCatalog;

/// Supervisor for the plain start/stop server kind.
pub struct GenericSupervisor {
    driver: ServerDriver,
}

impl GenericSupervisor {
    /// Build the supervisor, validating configuration once. Fatal on a
    /// missing path.
    pub fn new(config: ServerConfig, process: Arc<dyn ProcessPort>) -> Result<Self, ControlError> {
        Ok(Self {
            driver: ServerDriver::new(config, process)?,
        })
    }

    /// Start the server.
    pub async fn start(&self) -> Result<ProcessHandle, ControlError> {
        self.driver.start().await
    }

    /// Stop the server; a no-op when already stopped.
    pub async fn stop(&self) -> Result<(), ControlError> {
        self.driver.stop().await
    }

    /// Stop then start.
    pub async fn restart(&self) -> Result<ProcessHandle, ControlError> {
        self.driver.restart().await
    }

    /// Liveness query.
    pub async fn is_running(&self) -> bool {
        self.driver.is_running().await
    }
}

/// Supervisor for the track-selecting server kind.
///
/// A requested selection is validated against the live catalog and
/// written into the server configuration file before the underlying
/// start; without a selection the file is launched as-is.
pub struct TrackSupervisor {
    driver: ServerDriver,
    catalog: TrackCatalog,
    patcher: ConfigPatcher,
}

impl TrackSupervisor {
    /// Build the supervisor, validating configuration once. Fatal on a
    /// missing path.
    pub fn new(
        config: TrackServerConfig,
        process: Arc<dyn ProcessPort>,
    ) -> Result<Self, ControlError> {
        config.validate()?;
        let catalog = TrackCatalog::new(config.tracks_path());
        let patcher = ConfigPatcher::new(config.config_path());
        Ok(Self {
            driver: ServerDriver::new(config.server, process)?,
            catalog,
            patcher,
        })
    }

    /// All selectable track entries, recomputed from the filesystem.
    pub fn tracks(&self) -> Result<Vec<String>, ControlError> {
        self.catalog.entries()
    }

    fn select(&self, selection: Option<&TrackSelection>) -> Result<(), ControlError> {
        if let Some(selection) = selection {
            self.catalog.validate(selection)?;
            self.patcher.apply(selection)?;
        }
        Ok(())
    }

    /// Start the server, optionally selecting a track first.
    pub async fn start(
        &self,
        selection: Option<&TrackSelection>,
    ) -> Result<ProcessHandle, ControlError> {
        self.select(selection)?;
        self.driver.start().await
    }

    /// Stop the server; a no-op when already stopped.
    pub async fn stop(&self) -> Result<(), ControlError> {
        self.driver.stop().await
    }

    /// Restart the server, optionally selecting a track first.
    pub async fn restart(
        &self,
        selection: Option<&TrackSelection>,
    ) -> Result<ProcessHandle, ControlError> {
        self.select(selection)?;
        self.driver.restart().await
    }

    /// Liveness query.
    pub async fn is_running(&self) -> bool {
        self.driver.is_running().await
    }
}

/// Supervisor for the world-stateful server kind.
///
/// With backups enabled, every stop runs the dual-cycle world snapshot
/// before the kill signal; a snapshot failure aborts the stop.
pub struct WorldSupervisor {
    driver: ServerDriver,
}

impl std::fmt::Debug for WorldSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldSupervisor").finish_non_exhaustive()
    }
}

impl WorldSupervisor {
    /// Build the supervisor with default backup timings.
    pub fn new(config: WorldServerConfig, process: Arc<dyn ProcessPort>) -> Result<Self, ControlError> {
        let coordinator = BackupCoordinator::new(&config.world_dir, &config.backup_dir);
        Self::with_coordinator(config, process, coordinator)
    }

    /// Build the supervisor around an explicitly tuned coordinator.
    pub fn with_coordinator(
        config: WorldServerConfig,
        process: Arc<dyn ProcessPort>,
        coordinator: BackupCoordinator,
    ) -> Result<Self, ControlError> {
        config.validate()?;
        let mut driver = ServerDriver::new(config.server, process)?;
        if config.backup_enabled {
            driver = driver.with_stop_hook(Arc::new(coordinator));
        }
        Ok(Self { driver })
    }

    /// Start the server.
    pub async fn start(&self) -> Result<ProcessHandle, ControlError> {
        self.driver.start().await
    }

    /// Stop the server, snapshotting world state first when enabled.
    pub async fn stop(&self) -> Result<(), ControlError> {
        self.driver.stop().await
    }

    /// Stop (with snapshot when enabled) then start.
    pub async fn restart(&self) -> Result<ProcessHandle, ControlError> {
        self.driver.restart().await
    }

    /// Liveness query.
    pub async fn is_running(&self) -> bool {
        self.driver.is_running().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backup::CYCLE_DIRS;
    use crate::test_support::{FakePort, server_config};
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use tokio::time::sleep;

    fn track_config(root: &Path) -> TrackServerConfig {
        let config = TrackServerConfig {
            server: server_config(root),
            tracks_dir: "content/tracks".into(),
            config_file: "cfg/server_cfg.ini".into(),
        };
        fs::create_dir_all(root.join("content/tracks/A/x")).unwrap();
        fs::create_dir_all(root.join("content/tracks/A/y")).unwrap();
        fs::create_dir_all(root.join("content/tracks/B")).unwrap();
        fs::create_dir_all(root.join("cfg")).unwrap();
        fs::write(
            root.join("cfg/server_cfg.ini"),
            "TRACK=old\nCONFIG_TRACK=older\n",
        )
        .unwrap();
        config
    }

    fn world_config(root: &Path) -> WorldServerConfig {
        let config = WorldServerConfig {
            server: server_config(root),
            world_dir: root.join("worlds"),
            backup_dir: root.join("backups"),
            backup_enabled: true,
        };
        fs::create_dir_all(root.join("worlds")).unwrap();
        fs::write(root.join("worlds/alpha.db"), b"alpha").unwrap();
        config
    }

    #[tokio::test]
    async fn generic_supervisor_runs_the_full_lifecycle() {
        let root = TempDir::new().unwrap();
        let port = Arc::new(FakePort::new());
        let supervisor =
            GenericSupervisor::new(server_config(root.path()), Arc::clone(&port) as _).unwrap();

        assert!(!supervisor.is_running().await);
        let handle = supervisor.start().await.unwrap();
        assert!(supervisor.is_running().await);

        let restarted = supervisor.restart().await.unwrap();
        assert_ne!(restarted.pid, handle.pid);

        supervisor.stop().await.unwrap();
        assert!(!supervisor.is_running().await);
        assert_eq!(port.process_count(), 0);
    }

    #[tokio::test]
    async fn track_start_with_selection_patches_the_config_file() {
        let root = TempDir::new().unwrap();
        let port = Arc::new(FakePort::new());
        let supervisor =
            TrackSupervisor::new(track_config(root.path()), Arc::clone(&port) as _).unwrap();

        supervisor
            .start(Some(&TrackSelection::new("A", Some("x".into()))))
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(root.path().join("cfg/server_cfg.ini")).unwrap(),
            "TRACK=A\nCONFIG_TRACK=x\n"
        );
    }

    #[tokio::test]
    async fn invalid_selection_is_rejected_before_any_mutation() {
        let root = TempDir::new().unwrap();
        let port = Arc::new(FakePort::new());
        let supervisor =
            TrackSupervisor::new(track_config(root.path()), Arc::clone(&port) as _).unwrap();

        let err = supervisor
            .start(Some(&TrackSelection::new("A", Some("z".into()))))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Validation(_)));

        // Neither the config file nor the process table was touched.
        assert_eq!(
            fs::read_to_string(root.path().join("cfg/server_cfg.ini")).unwrap(),
            "TRACK=old\nCONFIG_TRACK=older\n"
        );
        assert_eq!(port.process_count(), 0);
    }

    #[tokio::test]
    async fn track_start_without_selection_launches_as_is() {
        let root = TempDir::new().unwrap();
        let port = Arc::new(FakePort::new());
        let supervisor =
            TrackSupervisor::new(track_config(root.path()), Arc::clone(&port) as _).unwrap();

        supervisor.start(None).await.unwrap();
        assert_eq!(
            fs::read_to_string(root.path().join("cfg/server_cfg.ini")).unwrap(),
            "TRACK=old\nCONFIG_TRACK=older\n"
        );
    }

    #[tokio::test]
    async fn tracks_listing_reflects_the_filesystem() {
        let root = TempDir::new().unwrap();
        let port = Arc::new(FakePort::new());
        let supervisor =
            TrackSupervisor::new(track_config(root.path()), Arc::clone(&port) as _).unwrap();

        let mut tracks = supervisor.tracks().unwrap();
        tracks.sort();
        assert_eq!(tracks, vec!["A x", "A y", "B"]);
    }

    #[tokio::test]
    async fn world_stop_snapshots_before_killing() {
        let root = TempDir::new().unwrap();
        let port = Arc::new(FakePort::new());
        let config = world_config(root.path());
        let coordinator = BackupCoordinator::new(&config.world_dir, &config.backup_dir)
            .with_cycle_delay(Duration::from_millis(20));
        let supervisor =
            WorldSupervisor::with_coordinator(config, Arc::clone(&port) as _, coordinator).unwrap();

        supervisor.start().await.unwrap();
        supervisor.stop().await.unwrap();

        assert_eq!(port.kill_count(), 1);
        for cycle in CYCLE_DIRS {
            assert!(root.path().join("backups").join(cycle).join("alpha.db").is_file());
        }
    }

    #[tokio::test]
    async fn stop_fails_fast_and_spares_the_process_while_backup_is_held() {
        let root = TempDir::new().unwrap();
        let port = Arc::new(FakePort::new());
        let config = world_config(root.path());
        let coordinator = BackupCoordinator::new(&config.world_dir, &config.backup_dir)
            .with_cycle_delay(Duration::from_millis(600))
            .with_lock_timeout(Duration::from_millis(50));
        let supervisor = WorldSupervisor::with_coordinator(
            config,
            Arc::clone(&port) as _,
            coordinator.clone(),
        )
        .unwrap();

        supervisor.start().await.unwrap();

        // Another party holds the backup token for the whole attempt.
        let holder = tokio::spawn(async move { coordinator.run().await });
        sleep(Duration::from_millis(100)).await;

        let started = Instant::now();
        let err = supervisor.stop().await.unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(400));
        assert!(matches!(err, ControlError::Operation { .. }));

        // The process was never killed and the driver still sees it.
        assert_eq!(port.kill_count(), 0);
        assert!(supervisor.is_running().await);

        holder.await.unwrap().unwrap();
        supervisor.stop().await.unwrap();
        assert_eq!(port.kill_count(), 1);
    }

    #[tokio::test]
    async fn disabled_backups_stop_without_snapshotting() {
        let root = TempDir::new().unwrap();
        let port = Arc::new(FakePort::new());
        let mut config = world_config(root.path());
        config.backup_enabled = false;
        let supervisor = WorldSupervisor::new(config, Arc::clone(&port) as _).unwrap();

        supervisor.start().await.unwrap();
        supervisor.stop().await.unwrap();
        assert!(!root.path().join("backups").exists());
    }

    #[tokio::test]
    async fn misconfigured_supervisor_is_never_built() {
        let root = TempDir::new().unwrap();
        let mut config = world_config(root.path());
        config.world_dir = root.path().join("missing");
        let err = WorldSupervisor::new(config, Arc::new(FakePort::new()) as _).unwrap_err();
        assert!(matches!(err, ControlError::Configuration(_)));
    }
}

//! Server driver: the per-instance start/stop/restart state machine.
//!
//! A driver owns exactly one handle slot. Every operation runs its whole
//! check-then-act sequence inside the driver's single critical section,
//! so concurrent requests against one instance cannot interleave between
//! the liveness check and the spawn/kill that follows it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::ports::{ControlError, Discovery, LaunchSpec, ProcessHandle, ProcessPort, reconcile};

/// Hook run after the running check and before the kill signal on stop.
///
/// A hook failure aborts the stop: the process is left untouched and the
/// handle stays attached.
#[async_trait]
pub trait StopHook: Send + Sync {
    /// Perform pre-stop work (e.g. a world snapshot).
    async fn before_stop(&self) -> Result<(), ControlError>;
}

/// Start/stop/restart state machine over one server process.
pub struct ServerDriver {
    config: ServerConfig,
    executable: PathBuf,
    process: Arc<dyn ProcessPort>,
    stop_hook: Option<Arc<dyn StopHook>>,
    handle: Mutex<Option<ProcessHandle>>,
}

impl ServerDriver {
    /// Create a driver, validating the configuration against the
    /// filesystem. Fatal on a missing path: a misconfigured driver never
    /// serves a request.
    pub fn new(config: ServerConfig, process: Arc<dyn ProcessPort>) -> Result<Self, ControlError> {
        config.validate()?;
        let executable = config.executable_path();
        Ok(Self {
            config,
            executable,
            process,
            stop_hook: None,
            handle: Mutex::new(None),
        })
    }

    /// Attach a hook that runs before the kill signal on every stop.
    #[must_use]
    pub fn with_stop_hook(mut self, hook: Arc<dyn StopHook>) -> Self {
        self.stop_hook = Some(hook);
        self
    }

    /// Refresh the handle slot and report whether the server is running.
    ///
    /// With an empty slot, reconciles a fresh by-name snapshot; ambiguous
    /// matches are logged and resolved by the adopt-first policy. With a
    /// held handle, re-queries liveness. An exited handle is left in the
    /// slot; clearing belongs to the next transition.
    async fn refresh(&self, slot: &mut Option<ProcessHandle>) -> bool {
        if slot.is_none() {
            debug!(
                name = %self.config.process_name,
                "no stored handle, checking running processes by name"
            );
            let snapshot = self.process.snapshot_by_name(&self.config.process_name).await;
            match reconcile(snapshot) {
                Discovery::None => {
                    debug!("server is not running");
                    return false;
                }
                Discovery::Single(handle) => {
                    info!(pid = handle.pid, "adopting running server process");
                    *slot = Some(handle);
                }
                Discovery::Ambiguous(candidates) => {
                    let pids: Vec<u32> = candidates.iter().map(|h| h.pid).collect();
                    warn!(?pids, "multiple matching processes found, adopting the first");
                    *slot = candidates.into_iter().next();
                }
            }
        }

        match slot.as_ref() {
            Some(handle) => self.process.is_alive(handle).await,
            None => false,
        }
    }

    async fn start_locked(
        &self,
        slot: &mut Option<ProcessHandle>,
    ) -> Result<ProcessHandle, ControlError> {
        if self.refresh(slot).await {
            info!("server is already running, refusing to start");
            return Err(ControlError::InvalidState("server is already running".into()));
        }

        let spec = LaunchSpec {
            executable: self.executable.clone(),
            working_dir: self.config.root_dir.clone(),
            args: self.config.launch_arguments.clone(),
        };
        debug!(executable = %spec.executable.display(), "starting new server process");
        let handle = self
            .process
            .spawn(&spec)
            .await
            .map_err(|e| ControlError::operation_with("failed to start the server process", e))?;
        info!(pid = handle.pid, "server started");
        // Any stale handle is replaced; the caller has just verified
        // the server was not running.
        *slot = Some(handle.clone());
        Ok(handle)
    }

    async fn stop_locked(&self, slot: &mut Option<ProcessHandle>) -> Result<(), ControlError> {
        if !self.refresh(slot).await {
            info!("server is already stopped");
            return Ok(());
        }

        if let Some(hook) = &self.stop_hook {
            hook.before_stop().await?;
        }

        if let Some(handle) = slot.as_ref() {
            debug!(pid = handle.pid, "killing server process");
            self.process
                .kill_and_wait(handle)
                .await
                .map_err(|e| ControlError::operation_with("failed to stop the server process", e))?;
        }
        // Exit confirmed; only now is the handle released.
        *slot = None;
        info!("server stopped");
        Ok(())
    }

    /// Start the server. Fails with [`ControlError::InvalidState`] if it
    /// is already running.
    pub async fn start(&self) -> Result<ProcessHandle, ControlError> {
        let mut slot = self.handle.lock().await;
        self.start_locked(&mut slot).await
    }

    /// Stop the server. A stop on an already-stopped server is a no-op.
    pub async fn stop(&self) -> Result<(), ControlError> {
        let mut slot = self.handle.lock().await;
        self.stop_locked(&mut slot).await
    }

    /// Stop then start, sequentially and non-atomically: if the start
    /// fails after a successful stop, the driver remains stopped.
    pub async fn restart(&self) -> Result<ProcessHandle, ControlError> {
        let mut slot = self.handle.lock().await;
        self.stop_locked(&mut slot).await?;
        self.start_locked(&mut slot).await
    }

    /// Liveness query: refresh the handle and report the current state.
    pub async fn is_running(&self) -> bool {
        let mut slot = self.handle.lock().await;
        self.refresh(&mut slot).await
    }
}

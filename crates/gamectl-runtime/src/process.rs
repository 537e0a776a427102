//! OS implementation of the process port.
//!
//! Process identity is never persisted: lookups go through a fresh
//! `sysinfo` process-table snapshot every time. Processes spawned here
//! keep their `Child` handle in a registry so they are reaped on kill;
//! processes adopted by name after a control-plane restart are killed by
//! signal and polled until the table confirms their exit.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use gamectl_core::ports::{LaunchSpec, ProcessError, ProcessHandle, ProcessPort};

use crate::signal;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Process port backed by the local OS process table.
pub struct OsProcessPort {
    /// Children spawned by this port, keyed by pid, kept for reaping.
    children: Mutex<HashMap<u32, Child>>,
    /// Optional bound on exit-waiting after a kill. `None` waits
    /// unbounded, matching the source design.
    exit_wait_deadline: Option<Duration>,
}

impl OsProcessPort {
    /// Create a port with unbounded exit-waiting.
    #[must_use]
    pub fn new() -> Self {
        Self {
            children: Mutex::new(HashMap::new()),
            exit_wait_deadline: None,
        }
    }

    /// Bound every exit wait with a deadline.
    #[must_use]
    pub const fn with_exit_deadline(mut self, deadline: Duration) -> Self {
        self.exit_wait_deadline = Some(deadline);
        self
    }

    /// Drop registry entries whose process has already exited.
    fn reap_exited(children: &mut HashMap<u32, Child>) {
        children.retain(|pid, child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid, %status, "reaped exited child");
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(pid, error = %e, "failed to poll child state");
                true
            }
        });
    }

    async fn kill_owned(&self, pid: u32, mut child: Child) -> Result<(), ProcessError> {
        debug!(pid, "killing owned child process");
        if let Err(e) = child.start_kill() {
            let reason = e.to_string();
            // Keep the handle so the process can still be reaped later.
            self.children.lock().await.insert(pid, child);
            return Err(ProcessError::KillFailed { pid, reason });
        }

        match self.exit_wait_deadline {
            Some(deadline) => match timeout(deadline, child.wait()).await {
                Ok(result) => {
                    result.map_err(ProcessError::Io)?;
                }
                Err(_) => {
                    self.children.lock().await.insert(pid, child);
                    return Err(ProcessError::WaitTimedOut { pid });
                }
            },
            None => {
                child.wait().await.map_err(ProcessError::Io)?;
            }
        }
        Ok(())
    }

    async fn kill_adopted(&self, pid: u32) -> Result<(), ProcessError> {
        debug!(pid, "killing adopted process");
        signal::kill_now(pid).map_err(|e| {
            if e.kind() == io::ErrorKind::Unsupported {
                ProcessError::Unsupported("killing adopted processes".into())
            } else {
                ProcessError::KillFailed {
                    pid,
                    reason: e.to_string(),
                }
            }
        })?;

        let mut waited = Duration::ZERO;
        while alive_in_table(pid) {
            sleep(EXIT_POLL_INTERVAL).await;
            if let Some(deadline) = self.exit_wait_deadline {
                waited += EXIT_POLL_INTERVAL;
                if waited >= deadline {
                    return Err(ProcessError::WaitTimedOut { pid });
                }
            }
        }
        Ok(())
    }
}

impl Default for OsProcessPort {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh-snapshot liveness check. A terminated-but-unreaped process
/// counts as exited.
fn alive_in_table(pid: u32) -> bool {
    let system = System::new_all();
    system.process(Pid::from_u32(pid)).is_some_and(|process| {
        !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
    })
}

#[async_trait]
impl ProcessPort for OsProcessPort {
    async fn snapshot_by_name(&self, process_name: &str) -> Vec<ProcessHandle> {
        let mut system = System::new_all();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut handles: Vec<ProcessHandle> = system
            .processes_by_exact_name(OsStr::new(process_name))
            .map(|process| ProcessHandle::new(process.pid().as_u32(), process_name))
            .collect();
        // The process table is unordered; pids are exposed ascending so
        // the adopt-first policy picks a stable candidate.
        handles.sort_by_key(|h| h.pid);
        handles
    }

    async fn is_alive(&self, handle: &ProcessHandle) -> bool {
        {
            let mut children = self.children.lock().await;
            if let Some(child) = children.get_mut(&handle.pid) {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        debug!(pid = handle.pid, %status, "child has exited");
                        children.remove(&handle.pid);
                        return false;
                    }
                    Ok(None) => return true,
                    Err(e) => {
                        warn!(pid = handle.pid, error = %e, "failed to poll child state");
                    }
                }
            }
        }
        alive_in_table(handle.pid)
    }

    async fn spawn(&self, spec: &LaunchSpec) -> Result<ProcessHandle, ProcessError> {
        let mut command = Command::new(&spec.executable);
        command
            .current_dir(&spec.working_dir)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = command.spawn().map_err(|e| {
            ProcessError::SpawnFailed(format!("{}: {e}", spec.executable.display()))
        })?;
        let Some(pid) = child.id() else {
            return Err(ProcessError::SpawnFailed(
                "spawned process exited before its pid could be read".into(),
            ));
        };

        info!(pid, executable = %spec.executable.display(), "server process started");
        let mut children = self.children.lock().await;
        Self::reap_exited(&mut children);
        children.insert(pid, child);

        let name = spec
            .executable
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ProcessHandle::new(pid, name))
    }

    async fn kill_and_wait(&self, handle: &ProcessHandle) -> Result<(), ProcessError> {
        let owned = self.children.lock().await.remove(&handle.pid);
        match owned {
            Some(child) => self.kill_owned(handle.pid, child).await,
            None => self.kill_adopted(handle.pid).await,
        }
    }
}

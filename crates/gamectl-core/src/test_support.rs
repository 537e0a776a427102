//! Shared fixtures for service tests: an in-memory process table and
//! filesystem scaffolding for server roots.

use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::ports::{LaunchSpec, ProcessError, ProcessHandle, ProcessPort};

/// In-memory process table implementing the process port.
///
/// Spawned handles are named after the executable file stem, matching
/// what a real process table reports.
pub struct FakePort {
    pub table: StdMutex<Vec<ProcessHandle>>,
    pub next_pid: AtomicU32,
    pub spawns: AtomicUsize,
    pub killed: StdMutex<Vec<u32>>,
    pub fail_spawn: AtomicBool,
}

impl FakePort {
    pub fn new() -> Self {
        Self {
            table: StdMutex::new(Vec::new()),
            next_pid: AtomicU32::new(100),
            spawns: AtomicUsize::new(0),
            killed: StdMutex::new(Vec::new()),
            fail_spawn: AtomicBool::new(false),
        }
    }

    pub fn seed(&self, handle: ProcessHandle) {
        self.table.lock().unwrap().push(handle);
    }

    pub fn process_count(&self) -> usize {
        self.table.lock().unwrap().len()
    }

    pub fn kill_count(&self) -> usize {
        self.killed.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessPort for FakePort {
    async fn snapshot_by_name(&self, process_name: &str) -> Vec<ProcessHandle> {
        self.table
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.name == process_name)
            .cloned()
            .collect()
    }

    async fn is_alive(&self, handle: &ProcessHandle) -> bool {
        self.table.lock().unwrap().iter().any(|h| h.pid == handle.pid)
    }

    async fn spawn(&self, spec: &LaunchSpec) -> Result<ProcessHandle, ProcessError> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(ProcessError::SpawnFailed("exec failed".into()));
        }
        self.spawns.fetch_add(1, Ordering::SeqCst);
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let name = spec
            .executable
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let handle = ProcessHandle::new(pid, name);
        self.table.lock().unwrap().push(handle.clone());
        Ok(handle)
    }

    async fn kill_and_wait(&self, handle: &ProcessHandle) -> Result<(), ProcessError> {
        self.killed.lock().unwrap().push(handle.pid);
        self.table.lock().unwrap().retain(|h| h.pid != handle.pid);
        Ok(())
    }
}

/// Lay out `<root>/bin/srv` and return a matching server config with
/// process name `srv`.
pub fn server_config(root: &Path) -> ServerConfig {
    std::fs::create_dir_all(root.join("bin")).unwrap();
    std::fs::write(root.join("bin/srv"), b"").unwrap();
    ServerConfig {
        root_dir: root.to_path_buf(),
        executable: PathBuf::from("bin/srv"),
        process_name: "srv".into(),
        launch_arguments: vec![],
    }
}

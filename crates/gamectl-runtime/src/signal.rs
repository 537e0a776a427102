//! Hard-kill signal delivery for processes adopted by name.
//!
//! Spawned processes are killed and reaped through their `Child` handle;
//! this path exists for processes rediscovered after a control-plane
//! restart, where no handle is available.

use std::io;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Deliver SIGKILL immediately, with no graceful-shutdown grace period.
///
/// A process that is already gone counts as success.
#[cfg(unix)]
pub fn kill_now(pid: u32) -> io::Result<()> {
    match signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
pub fn kill_now(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "killing adopted processes is not implemented on this platform",
    ))
}

//! Liveness probing and termination of recorded processes.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, warn};

/// Seam over the OS process table.
pub trait ProcessTable {
    /// `true` when `pid` names an existing process.
    fn is_alive(&self, pid: u32) -> bool;

    /// Ask `pid` to terminate; returns whether the signal was delivered.
    ///
    /// Delivery failures are expected (the process usually already exited)
    /// and are reported as `false` rather than an error.
    fn terminate(&self, pid: u32) -> bool;
}

/// Process table backed by `kill(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn is_alive(&self, pid: u32) -> bool {
        let Some(target) = to_pid(pid) else {
            return false;
        };
        match kill(target, None) {
            Ok(()) | Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn terminate(&self, pid: u32) -> bool {
        let Some(target) = to_pid(pid) else {
            return false;
        };
        match kill(target, Signal::SIGTERM) {
            Ok(()) => true,
            Err(Errno::ESRCH) => {
                debug!(pid, "process already gone");
                false
            }
            Err(errno) => {
                warn!(pid, error = %errno, "failed to signal process");
                false
            }
        }
    }
}

// Non-positive pids address process groups and must never reach kill(2).
fn to_pid(pid: u32) -> Option<Pid> {
    i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .map(Pid::from_raw)
}

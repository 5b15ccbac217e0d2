//! Start/stop/status over a single PID record.
//!
//! # Design
//! - Two states: the record is absent, or it holds a pid.
//! - `start` and `stop` run under the record lock so concurrent callers
//!   cannot both conclude "not running" and launch twice.
//! - `status` is a read-only check: it takes no lock and never repairs a
//!   stale record; that is left to the next `start` or `stop`.

use std::path::PathBuf;

use comfypod_config::{PodLayout, ServerCommand};
use tracing::{info, warn};

use crate::error::SupervisorResult;
use crate::launch::{CommandLauncher, Launcher};
use crate::process::{ProcessTable, SystemProcessTable};
use crate::record::{FileRecordStore, RecordStore};

/// The currently supervised server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandle {
    /// Recorded process identifier.
    pub pid: u32,
    /// Where the record lives.
    pub record_path: PathBuf,
}

/// Result of [`Supervisor::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new server was launched and recorded.
    Started {
        /// Handle of the new process.
        handle: ServerHandle,
        /// Pid of a stale record that was replaced, if any.
        replaced_stale: Option<u32>,
    },
    /// A live server was already recorded; nothing was launched.
    AlreadyRunning(ServerHandle),
}

/// Result of [`Supervisor::stop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// A record existed and was removed.
    Stopped {
        /// Pid that was recorded.
        pid: u32,
        /// Whether the termination signal reached a process.
        signalled: bool,
    },
    /// No record existed.
    NotRunning,
}

/// Result of [`Supervisor::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    /// The recorded pid is live.
    Running(ServerHandle),
    /// A record exists but its pid is not live.
    Stale {
        /// Pid held by the stale record.
        pid: u32,
    },
    /// No usable record exists.
    NotRunning,
}

impl ServerStatus {
    /// `true` only for [`ServerStatus::Running`].
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }
}

/// Supervisor over injected storage, process table, and launcher.
#[derive(Debug, Clone)]
pub struct Supervisor<S, P, L> {
    store: S,
    processes: P,
    launcher: L,
}

/// Supervisor wired to the real filesystem and OS.
pub type SystemSupervisor = Supervisor<FileRecordStore, SystemProcessTable, CommandLauncher>;

impl SystemSupervisor {
    /// Supervisor for the configured pod layout and server command.
    #[must_use]
    pub fn from_config(layout: &PodLayout, server: &ServerCommand) -> Self {
        Self::new(
            FileRecordStore::new(layout.pid_file.clone()),
            SystemProcessTable,
            CommandLauncher::from_config(layout, server),
        )
    }
}

impl<S, P, L> Supervisor<S, P, L>
where
    S: RecordStore,
    P: ProcessTable,
    L: Launcher,
{
    /// Assemble a supervisor from its parts.
    pub const fn new(store: S, processes: P, launcher: L) -> Self {
        Self {
            store,
            processes,
            launcher,
        }
    }

    /// Launch the server unless a live one is already recorded.
    ///
    /// # Errors
    ///
    /// Returns an error when the lock cannot be taken, the launch fails, or
    /// the new pid cannot be recorded.
    pub fn start(&self) -> SupervisorResult<StartOutcome> {
        let _guard = self.store.lock()?;

        let replaced_stale = match self.store.load()? {
            Some(pid) if self.processes.is_alive(pid) => {
                info!(pid, "server already running");
                return Ok(StartOutcome::AlreadyRunning(self.handle(pid)));
            }
            Some(pid) => {
                warn!(pid, "replacing stale pid record");
                Some(pid)
            }
            None => None,
        };

        let pid = self.launcher.launch()?;
        self.store.save(pid)?;
        info!(pid, record = %self.store.record_path().display(), "server recorded");
        Ok(StartOutcome::Started {
            handle: self.handle(pid),
            replaced_stale,
        })
    }

    /// Signal the recorded server and remove the record.
    ///
    /// # Errors
    ///
    /// Returns an error only for lock or record storage failures; a process
    /// that already exited is not an error.
    pub fn stop(&self) -> SupervisorResult<StopOutcome> {
        let _guard = self.store.lock()?;

        let Some(pid) = self.store.load()? else {
            return Ok(StopOutcome::NotRunning);
        };
        let signalled = self.processes.terminate(pid);
        self.store.clear()?;
        info!(pid, signalled, "server stopped");
        Ok(StopOutcome::Stopped { pid, signalled })
    }

    /// Report whether the recorded server is live without touching the record.
    ///
    /// # Errors
    ///
    /// Returns an error when the record store fails to load.
    pub fn status(&self) -> SupervisorResult<ServerStatus> {
        Ok(match self.store.load()? {
            Some(pid) if self.processes.is_alive(pid) => ServerStatus::Running(self.handle(pid)),
            Some(pid) => ServerStatus::Stale { pid },
            None => ServerStatus::NotRunning,
        })
    }

    fn handle(&self, pid: u32) -> ServerHandle {
        ServerHandle {
            pid,
            record_path: self.store.record_path().to_path_buf(),
        }
    }
}

//! Detached launch of the server process.
//!
//! The launcher spawns, captures the pid, and hands the child to a detached
//! reaper thread so an early exit is collected instead of lingering as a
//! zombie that `kill(pid, 0)` would still report as live. Readiness of the
//! server is never observed here.
//!
//! The server gets its own process group but stays in the caller's session:
//! `setsid` would need a `pre_exec` hook, which requires `unsafe`. Terminal
//! job-control signals aimed at the caller's group do not reach it.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

use comfypod_config::{PodLayout, ServerCommand};
use tracing::{debug, info, warn};

use crate::error::{SupervisorError, SupervisorResult};

/// Seam over process creation.
pub trait Launcher {
    /// Start the server and return its pid without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error when the process cannot be spawned.
    fn launch(&self) -> SupervisorResult<u32>;
}

/// Launches a configured command with output appended to a log file.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    log_file: PathBuf,
}

impl CommandLauncher {
    /// Launcher for `program args..` run from `working_dir`.
    #[must_use]
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            log_file: log_file.into(),
        }
    }

    /// Launcher built from pod configuration.
    #[must_use]
    pub fn from_config(layout: &PodLayout, server: &ServerCommand) -> Self {
        Self::new(
            server.program.clone(),
            server.args.clone(),
            server.working_dir.clone(),
            layout.log_file.clone(),
        )
    }
}

impl Launcher for CommandLauncher {
    fn launch(&self) -> SupervisorResult<u32> {
        if let Some(dir) = self.log_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| SupervisorError::io("log.create_dir", dir, err))?;
        }
        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .map_err(|err| SupervisorError::io("log.open", &self.log_file, err))?;
        let stderr = stdout
            .try_clone()
            .map_err(|err| SupervisorError::io("log.clone", &self.log_file, err))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        // Own process group: terminal signals aimed at the caller skip the server.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| SupervisorError::Launch {
            program: self.program.clone(),
            source,
        })?;
        let pid = child.id();
        info!(pid, program = %self.program, log = %self.log_file.display(), "server launched");

        let reaper = thread::Builder::new()
            .name(format!("reap-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => debug!(pid, %status, "server exited"),
                Err(err) => warn!(pid, error = %err, "failed to reap server"),
            });
        if let Err(err) = reaper {
            warn!(pid, error = %err, "reaper thread not started; exit will not be collected");
        }
        Ok(pid)
    }
}

//! Persisted PID record of the supervised server.
//!
//! # Design
//! - The record holds exactly one textual integer.
//! - A missing, unreadable, or malformed record loads as absent.
//! - Saves go through a temp file in the same directory and a rename.
//! - Check-and-act sequences hold an exclusive `flock` on `<record>.lock`,
//!   a sibling file that survives `clear()`.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{SupervisorError, SupervisorResult};

/// Storage seam for the PID record.
pub trait RecordStore {
    /// Location reported in [`crate::ServerHandle::record_path`].
    fn record_path(&self) -> &Path;

    /// Read the recorded pid, `None` when absent or unusable.
    ///
    /// # Errors
    ///
    /// Implementations may fail on storage errors they cannot interpret as
    /// "absent".
    fn load(&self) -> SupervisorResult<Option<u32>>;

    /// Persist `pid`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns an error when the record cannot be written.
    fn save(&self, pid: u32) -> SupervisorResult<()>;

    /// Remove the record; removing an absent record succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing record cannot be removed.
    fn clear(&self) -> SupervisorResult<()>;

    /// Take the exclusive lock guarding check-and-act sequences.
    ///
    /// # Errors
    ///
    /// Returns an error when the lock cannot be acquired.
    fn lock(&self) -> SupervisorResult<RecordGuard>;
}

/// Held lock over the record; released on drop.
#[must_use = "the record lock is released as soon as the guard is dropped"]
pub struct RecordGuard {
    _lock: Option<Flock<File>>,
}

impl RecordGuard {
    /// Guard for stores that need no OS-level lock.
    pub const fn unlocked() -> Self {
        Self { _lock: None }
    }
}

/// PID record stored as a plain file.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileRecordStore {
    /// Store backed by `path`; the lock lives at `<path>.lock`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_path = OsString::from(path.as_os_str());
        lock_path.push(".lock");
        Self {
            path,
            lock_path: PathBuf::from(lock_path),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl RecordStore for FileRecordStore {
    fn record_path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> SupervisorResult<Option<u32>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "pid record unreadable; treating as absent");
                return Ok(None);
            }
        };
        let pid = parse_pid(&contents);
        if pid.is_none() {
            warn!(path = %self.path.display(), contents = contents.trim(), "pid record malformed; treating as absent");
        }
        Ok(pid)
    }

    fn save(&self, pid: u32) -> SupervisorResult<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|err| SupervisorError::io("record.create_dir", dir, err))?;
        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|err| SupervisorError::io("record.temp", dir, err))?;
        writeln!(temp, "{pid}").map_err(|err| SupervisorError::io("record.write", temp.path(), err))?;
        temp.persist(&self.path)
            .map_err(|err| SupervisorError::io("record.persist", &self.path, err.error))?;
        Ok(())
    }

    fn clear(&self) -> SupervisorResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SupervisorError::io("record.clear", &self.path, err)),
        }
    }

    fn lock(&self) -> SupervisorResult<RecordGuard> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|err| SupervisorError::io("lock.create_dir", dir, err))?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|err| SupervisorError::io("lock.open", &self.lock_path, err))?;
        let lock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            SupervisorError::Lock {
                path: self.lock_path.clone(),
                source: errno,
            }
        })?;
        Ok(RecordGuard { _lock: Some(lock) })
    }
}

/// Parse record contents; zero is rejected since it addresses a process group.
fn parse_pid(contents: &str) -> Option<u32> {
    contents
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|pid| *pid != 0)
}

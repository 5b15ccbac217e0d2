//! # Design
//!
//! - Constant error messages; context lives in fields.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Errors produced while supervising the server process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Filesystem access to the record, lock, or log failed.
    #[error("supervisor io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Acquiring the exclusive record lock failed.
    #[error("supervisor lock failure")]
    Lock {
        /// Lock file path.
        path: PathBuf,
        /// Underlying errno.
        source: nix::Error,
    },
    /// The server process could not be spawned.
    #[error("server launch failed")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl SupervisorError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Render the error together with its context fields and source.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Io {
                operation,
                path,
                source,
            } => format!("{self}: {operation} {}: {source}", path.display()),
            Self::Lock { path, source } => format!("{self}: {}: {source}", path.display()),
            Self::Launch { program, source } => format!("{self}: {program}: {source}"),
        }
    }
}

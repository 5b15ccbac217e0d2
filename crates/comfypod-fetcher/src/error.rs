//! # Design
//!
//! - Constant error messages; request and path context lives in fields.
//! - `detail()` renders the full chain for per-item failure reasons.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for fetcher operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors produced while resolving or installing assets.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No bearer credential was supplied.
    #[error("missing credential")]
    MissingCredential,
    /// A URL could not be built or parsed.
    #[error("invalid url")]
    InvalidUrl {
        /// Operation that built the URL.
        operation: &'static str,
        /// Offending input.
        value: String,
    },
    /// The HTTP exchange failed (connect, timeout, body decode).
    #[error("http request failed")]
    Http {
        /// Operation that issued the request.
        operation: &'static str,
        /// Request URL.
        url: String,
        /// Underlying client error.
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("http response status error")]
    HttpStatus {
        /// Operation that issued the request.
        operation: &'static str,
        /// Request URL.
        url: String,
        /// Status code returned.
        status: u16,
    },
    /// Filesystem access failed.
    #[error("fetcher io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Metadata could not be encoded or decoded.
    #[error("fetcher json failure")]
    Json {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl FetchError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn http(operation: &'static str, url: &impl ToString, source: reqwest::Error) -> Self {
        Self::Http {
            operation,
            url: url.to_string(),
            source,
        }
    }

    /// Render the error together with its context fields and source.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::MissingCredential => self.to_string(),
            Self::InvalidUrl { operation, value } => format!("{self}: {operation}: {value}"),
            Self::Http {
                operation,
                url,
                source,
            } => format!("{self}: {operation} {url}: {source}"),
            Self::HttpStatus {
                operation,
                url,
                status,
            } => format!("{self}: {operation} {url} returned {status}"),
            Self::Io {
                operation,
                path,
                source,
            } => format!("{self}: {operation} {}: {source}", path.display()),
            Self::Json {
                operation,
                path,
                source,
            } => format!("{self}: {operation} {}: {source}", path.display()),
        }
    }
}

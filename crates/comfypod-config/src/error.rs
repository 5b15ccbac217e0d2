//! Error types for configuration loading.

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment value could not be parsed.
    #[error("invalid configuration value")]
    InvalidValue {
        /// Environment variable that failed to parse.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value.
        value: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str, value: &str) -> Self {
        Self::InvalidValue {
            field,
            reason,
            value: value.to_string(),
        }
    }

    /// Render the error together with its context fields.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidValue {
                field,
                reason,
                value,
            } => format!("{self}: {field}={value:?} ({reason})"),
        }
    }
}

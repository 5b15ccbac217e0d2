//! Ordered identifier lists and per-item download outcomes.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Separator between identifiers in a batch string.
pub const SEPARATOR: char = ',';

/// Ordered identifiers requested in one download invocation.
///
/// Identifiers are opaque; duplicates are kept and processed twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ids: Vec<String>,
}

impl Batch {
    /// Split `input` on commas, trimming whitespace and dropping empty
    /// segments.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self {
            ids: input
                .split(SEPARATOR)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Identifiers in request order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// `true` when nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Batch {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Why a single identifier was not installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The lookup response carried no download URL.
    NoDownloadUrl,
    /// The metadata lookup failed.
    Lookup(String),
    /// Retrieving or installing the file failed.
    Transfer(String),
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDownloadUrl => f.write_str("no download URL found"),
            Self::Lookup(detail) => write!(f, "lookup failed: {detail}"),
            Self::Transfer(detail) => write!(f, "download failed: {detail}"),
        }
    }
}

/// Outcome for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The asset was installed.
    Downloaded {
        /// Requested identifier.
        id: String,
        /// Installed file name.
        file_name: String,
        /// Installed file path.
        path: PathBuf,
    },
    /// The asset was skipped.
    Failed {
        /// Requested identifier.
        id: String,
        /// Failure cause.
        reason: FailureReason,
    },
}

impl ItemOutcome {
    /// Identifier this outcome belongs to.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Downloaded { id, .. } | Self::Failed { id, .. } => id,
        }
    }

    /// `true` for [`ItemOutcome::Downloaded`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// One entry per requested identifier.
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    /// Number of installed assets.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    /// Number of skipped assets.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// `true` when every identifier was installed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

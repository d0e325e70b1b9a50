//! Load failure taxonomy.

use std::fmt;
use thiserror::Error;

/// Why a grammar artifact could not be turned into a usable handle.
///
/// Every failure is terminal: it points at a build or packaging defect that has
/// to be fixed upstream, so nothing in this crate retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The artifact, or a piece of it, could not be located or read.
    #[error("grammar '{name}' could not be found: {reason}")]
    ArtifactMissing {
        /// Grammar name.
        name: String,
        /// What was missing.
        reason: String,
    },

    /// The artifact's ABI version is outside what the runtime accepts.
    #[error("grammar '{name}' has ABI version {found}, runtime accepts {min}..={max}")]
    AbiMismatch {
        /// Grammar name.
        name: String,
        /// Version recorded in the artifact.
        found: usize,
        /// Lowest accepted version.
        min: usize,
        /// Highest accepted version.
        max: usize,
    },

    /// The artifact is present but corrupt or incomplete.
    #[error("grammar '{name}' is structurally invalid: {reason}")]
    StructurallyInvalid {
        /// Grammar name.
        name: String,
        /// What the structural check rejected.
        reason: String,
    },
}

/// Classification of a [`LoadError`], without its diagnostic payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    /// See [`LoadError::ArtifactMissing`].
    ArtifactMissing,
    /// See [`LoadError::AbiMismatch`].
    AbiMismatch,
    /// See [`LoadError::StructurallyInvalid`].
    StructurallyInvalid,
}

impl LoadError {
    pub(crate) fn missing(name: &str, reason: impl Into<String>) -> Self {
        Self::ArtifactMissing {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::StructurallyInvalid {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }

    /// Returns the error's classification.
    #[must_use]
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::ArtifactMissing { .. } => LoadErrorKind::ArtifactMissing,
            Self::AbiMismatch { .. } => LoadErrorKind::AbiMismatch,
            Self::StructurallyInvalid { .. } => LoadErrorKind::StructurallyInvalid,
        }
    }

    /// Name of the grammar that failed to load.
    #[must_use]
    pub fn grammar(&self) -> &str {
        match self {
            Self::ArtifactMissing { name, .. }
            | Self::AbiMismatch { name, .. }
            | Self::StructurallyInvalid { name, .. } => name,
        }
    }
}

impl LoadErrorKind {
    /// Stable kebab-case label, used in CLI diagnostics and JSON reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ArtifactMissing => "artifact-missing",
            Self::AbiMismatch => "abi-mismatch",
            Self::StructurallyInvalid => "structurally-invalid",
        }
    }
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

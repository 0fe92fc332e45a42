//! Error types for the weaving core.

use thiserror::Error;

use crate::aspect::AspectError;
use loom_syntax::SyntaxError;

/// Errors raised while weaving one source unit.
///
/// Every variant names the offending unit; a failure aborts that unit only
/// and never corrupts the output of other units.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WeaveError {
    /// The unit's source text did not parse cleanly.
    #[error("failed to parse '{path}': {message}")]
    Parse {
        /// Path of the offending unit.
        path: String,
        /// Description of the first syntax error.
        message: String,
    },

    /// Building declarations or editing the token stream failed.
    #[error("failed to weave '{path}'")]
    Unit {
        /// Path of the offending unit.
        path: String,
        /// The underlying failure.
        #[source]
        source: SyntaxError,
    },

    /// Lazily materialising a registered aspect failed.
    ///
    /// Aspects loaded before the failure remain usable for later units.
    #[error("aspect materialisation failed while weaving '{path}'")]
    Aspect {
        /// Path of the unit that triggered the lazy load.
        path: String,
        /// The underlying failure.
        #[source]
        source: AspectError,
    },
}

impl WeaveError {
    /// Creates a parse error for the given unit.
    #[must_use]
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wraps a syntax-layer failure for the given unit.
    #[must_use]
    pub fn unit(path: impl Into<String>, source: SyntaxError) -> Self {
        Self::Unit {
            path: path.into(),
            source,
        }
    }

    /// Wraps an aspect materialisation failure for the given unit.
    #[must_use]
    pub fn aspect(path: impl Into<String>, source: AspectError) -> Self {
        Self::Aspect {
            path: path.into(),
            source,
        }
    }

    /// Returns the path of the unit this error aborted.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Parse { path, .. } | Self::Unit { path, .. } | Self::Aspect { path, .. } => path,
        }
    }
}

//! Error types surfaced by the command-line boundary.

use thiserror::Error;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use loom_core::AspectError;
use loom_syntax::SyntaxError;

/// Errors that abort a CLI invocation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CliError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Telemetry initialisation failed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The parser backing the weaver could not be initialised.
    #[error("failed to initialise the weaver")]
    Syntax(#[from] SyntaxError),

    /// Materialising a configured aspect failed.
    #[error(transparent)]
    Aspect(#[from] AspectError),

    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// One or more units aborted during weaving.
    ///
    /// Each failure was already reported as it happened; the run still
    /// visits every remaining unit before surfacing this.
    #[error("{failed} unit(s) failed to weave")]
    UnitFailures {
        /// Number of aborted units.
        failed: usize,
    },
}

//! CLI argument definitions for the Loom weaver.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for the Loom load-time weaver.
#[derive(Parser, Debug)]
#[command(name = "loom", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Path to the weaver configuration file.
    #[arg(long, short, value_name = "FILE", default_value = "loom.json")]
    pub(crate) config: Utf8PathBuf,
    /// The command to run.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Structured subcommands for the Loom CLI.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Weaves every configured source unit into the cache directory.
    Weave {
        /// Overrides the configured cache directory.
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<Utf8PathBuf>,
    },
    /// Prints the materialised advisors and each unit's weave decision
    /// without writing anything.
    Inspect,
}

//! Command-line boundary for the Loom load-time weaver.
//!
//! The CLI owns everything outside the weaving core: configuration
//! loading, aspect manifests, source enumeration, the woven-output cache,
//! and telemetry. `loom weave` runs the full pipeline; `loom inspect`
//! materialises the configured aspects and reports advisors and per-unit
//! weave decisions without writing anything.

pub mod aspects;
pub mod cache;
mod cli;
pub mod config;
pub mod enumerate;
mod errors;
pub mod telemetry;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use tracing::{debug, error};

use crate::cli::{Cli, CliCommand};
use crate::config::Config;
pub use crate::errors::CliError;
use loom_core::Weaver;

/// Parses arguments and runs the requested command.
///
/// Command output goes to `stdout`, errors and usage text to `stderr`.
pub fn run<I>(args: I, stdout: &mut dyn Write, stderr: &mut dyn Write) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(parse_error) => {
            let rendered = parse_error.render();
            if parse_error.use_stderr() {
                let _ = writeln!(stderr, "{rendered}");
            } else {
                let _ = writeln!(stdout, "{rendered}");
            }
            return u8::try_from(parse_error.exit_code())
                .map_or(ExitCode::FAILURE, ExitCode::from);
        }
    };

    match execute(&cli, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(run_error) => {
            let _ = writeln!(stderr, "loom: {run_error}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli, stdout: &mut dyn Write) -> Result<(), CliError> {
    let mut config = Config::load(&cli.config)?;
    telemetry::initialise(&config)?;

    match &cli.command {
        CliCommand::Weave { cache_dir } => {
            if let Some(dir) = cache_dir {
                config.set_cache_dir(dir.clone());
            }
            weave_all(&config, stdout)
        }
        CliCommand::Inspect => inspect(&config, stdout),
    }
}

/// Weaves every enumerated unit, persisting into the cache when one is
/// configured.
///
/// Without a cache directory the run is memory-only: units are woven and
/// counted but nothing is written. A unit that cannot be read, woven, or
/// cached is reported and skipped; the run visits all remaining units and
/// surfaces the failure count at the end.
fn weave_all(config: &Config, stdout: &mut dyn Write) -> Result<(), CliError> {
    let registry = aspects::build_registry(config.aspects());
    let mut weaver = Weaver::new(registry)?;

    let sources = enumerate::php_sources(config);
    let total = sources.len();
    let mut transformed = 0usize;
    let mut failed = 0usize;

    for path in &sources {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(read_error) => {
                error!(path = %path, error = %read_error, "unit unreadable");
                failed = failed.saturating_add(1);
                continue;
            }
        };
        match weaver.weave(path.as_str(), &source) {
            Ok(unit) => {
                if let Some(cache_dir) = config.cache_dir() {
                    match cache::write_unit(cache_dir, config.app_root(), path, unit.code()) {
                        Ok(target) => debug!(path = %path, target = %target, "cached unit"),
                        Err(cache_error) => {
                            error!(path = %path, error = %cache_error, "cache write failed");
                            failed = failed.saturating_add(1);
                            continue;
                        }
                    }
                }
                if unit.was_transformed() {
                    transformed = transformed.saturating_add(1);
                }
            }
            Err(weave_error) => {
                error!(path = %path, error = %weave_error, "unit aborted");
                failed = failed.saturating_add(1);
            }
        }
    }

    match config.cache_dir() {
        Some(cache_dir) => {
            writeln!(stdout, "wove {transformed} of {total} unit(s) into {cache_dir}")?;
        }
        None => {
            writeln!(
                stdout,
                "would weave {transformed} of {total} unit(s) (no cache directory configured)"
            )?;
        }
    }
    if failed > 0 {
        return Err(CliError::UnitFailures { failed });
    }
    Ok(())
}

/// Prints the materialised advisors, then each unit's weave decision,
/// without writing anything.
fn inspect(config: &Config, stdout: &mut dyn Write) -> Result<(), CliError> {
    let mut registry = aspects::build_registry(config.aspects());
    registry.materialize()?;

    for advisor in registry.advisors() {
        let line = serde_json::json!({
            "id": advisor.id(),
            "pointcut": advisor.pointcut().to_string(),
            "phase": advisor.phase().as_str(),
            "priority": advisor.priority(),
        });
        writeln!(stdout, "{line}")?;
    }

    let mut weaver = Weaver::new(aspects::build_registry(config.aspects()))?;
    for path in enumerate::php_sources(config) {
        let line = match std::fs::read_to_string(&path) {
            Ok(source) => match weaver.weave(path.as_str(), &source) {
                Ok(unit) => serde_json::json!({
                    "path": path.as_str(),
                    "transformed": unit.was_transformed(),
                }),
                Err(weave_error) => serde_json::json!({
                    "path": path.as_str(),
                    "error": weave_error.to_string(),
                }),
            },
            Err(read_error) => serde_json::json!({
                "path": path.as_str(),
                "error": format!("failed to read source: {read_error}"),
            }),
        };
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}

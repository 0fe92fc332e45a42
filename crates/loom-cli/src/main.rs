//! CLI entrypoint for the Loom load-time weaver.
//!
//! The binary delegates to [`loom_cli::run`], which parses arguments, loads
//! configuration, and executes the requested weaving command.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    loom_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}

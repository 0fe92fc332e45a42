//! Smoke tests against the compiled `loom` binary.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_both_commands() -> Result<()> {
    Command::cargo_bin("loom")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("weave").and(predicate::str::contains("inspect")));
    Ok(())
}

#[test]
fn missing_config_fails_with_a_diagnostic() -> Result<()> {
    Command::cargo_bin("loom")?
        .args(["--config", "/does/not/exist.json", "weave"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read configuration"));
    Ok(())
}

#[test]
fn unknown_subcommand_is_a_usage_error() -> Result<()> {
    Command::cargo_bin("loom")?
        .arg("unravel")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage").or(predicate::str::contains("usage")));
    Ok(())
}

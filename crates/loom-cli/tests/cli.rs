//! End-to-end tests driving the CLI pipeline against temporary app trees.

use std::ffi::OsString;
use std::fs;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

fn args(parts: &[&str]) -> Vec<OsString> {
    parts.iter().map(OsString::from).collect()
}

// ExitCode carries no PartialEq; compare through its Debug form.
fn exit_repr(code: ExitCode) -> String {
    format!("{code:?}")
}

fn assert_success(code: ExitCode, stderr: &[u8]) {
    assert_eq!(
        exit_repr(code),
        exit_repr(ExitCode::SUCCESS),
        "{}",
        String::from_utf8_lossy(stderr)
    );
}

fn assert_failure(code: ExitCode) {
    assert_eq!(exit_repr(code), exit_repr(ExitCode::FAILURE));
}

fn utf8_root(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir")
}

fn write_file(path: &Utf8Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write file");
}

const GREETER: &str = "<?php\n\nnamespace Demo;\n\nfinal class Greeter\n{\n    public function hello(): string\n    {\n        return \"hi\";\n    }\n}\n";

const BYSTANDER: &str = "<?php\n\nnamespace Other;\n\nclass   Bystander {\n    public function noop() { return 1; }\n}\n";

fn logging_config(root: &Utf8Path) -> String {
    format!(
        r#"{{
            "app_root": "{root}",
            "cache_dir": "{root}/cache",
            "include_paths": ["src"],
            "exclude_paths": ["src/vendor"],
            "log_filter": "warn",
            "aspects": [
                {{
                    "name": "Logging",
                    "advisors": [
                        {{"pointcut": "execution(Demo\\Greeter->hello)", "phase": "around", "priority": 1}}
                    ]
                }}
            ]
        }}"#
    )
}

#[test]
fn weave_caches_woven_and_untouched_units() {
    let dir = TempDir::new().expect("tempdir");
    let root = utf8_root(&dir);
    write_file(&root.join("src/Greeter.php"), GREETER);
    write_file(&root.join("src/Bystander.php"), BYSTANDER);
    write_file(&root.join("src/vendor/Lib.php"), "<?php class Lib {}\n");
    let config_path = root.join("loom.json");
    write_file(&config_path, &logging_config(&root));

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(
        args(&["loom", "--config", config_path.as_str(), "weave"]),
        &mut stdout,
        &mut stderr,
    );
    assert_success(code, &stderr);

    let woven = fs::read_to_string(root.join("cache/src/Greeter.php")).expect("woven entry");
    assert!(woven.contains("Greeter__AopProxied"));
    assert!(woven.contains("'advisor.Logging->0'"));

    // The abstaining unit is cached byte-identically.
    let untouched =
        fs::read_to_string(root.join("cache/src/Bystander.php")).expect("untouched entry");
    assert_eq!(untouched, BYSTANDER);

    // The excluded directory is never visited.
    assert!(!root.join("cache/src/vendor/Lib.php").as_std_path().exists());

    let summary = String::from_utf8_lossy(&stdout);
    assert!(summary.contains("wove 1 of 2 unit(s)"), "summary: {summary}");
}

#[test]
fn cache_dir_flag_overrides_the_configured_directory() {
    let dir = TempDir::new().expect("tempdir");
    let root = utf8_root(&dir);
    write_file(&root.join("src/Greeter.php"), GREETER);
    let config_path = root.join("loom.json");
    write_file(&config_path, &logging_config(&root));

    let alt = root.join("alt-cache");
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(
        args(&[
            "loom",
            "--config",
            config_path.as_str(),
            "weave",
            "--cache-dir",
            alt.as_str(),
        ]),
        &mut stdout,
        &mut stderr,
    );
    assert_success(code, &stderr);
    assert!(alt.join("src/Greeter.php").as_std_path().exists());
}

#[test]
fn broken_units_are_reported_but_do_not_stop_the_run() {
    let dir = TempDir::new().expect("tempdir");
    let root = utf8_root(&dir);
    write_file(&root.join("src/Greeter.php"), GREETER);
    write_file(&root.join("src/Broken.php"), "<?php class Broken {");
    let config_path = root.join("loom.json");
    write_file(&config_path, &logging_config(&root));

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(
        args(&["loom", "--config", config_path.as_str(), "weave"]),
        &mut stdout,
        &mut stderr,
    );
    assert_failure(code);

    // The healthy unit was still woven and cached.
    assert!(root.join("cache/src/Greeter.php").as_std_path().exists());
    assert!(!root.join("cache/src/Broken.php").as_std_path().exists());
    let message = String::from_utf8_lossy(&stderr);
    assert!(message.contains("1 unit(s) failed"), "stderr: {message}");
}

#[test]
fn cache_write_failures_do_not_stop_the_run() {
    let dir = TempDir::new().expect("tempdir");
    let root = utf8_root(&dir);
    write_file(&root.join("src/a/One.php"), GREETER);
    write_file(&root.join("src/b/Two.php"), BYSTANDER);
    let config_path = root.join("loom.json");
    write_file(&config_path, &logging_config(&root));

    // A plain file where the first unit's cache parent belongs.
    write_file(&root.join("cache/src/a"), "not a directory");

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(
        args(&["loom", "--config", config_path.as_str(), "weave"]),
        &mut stdout,
        &mut stderr,
    );
    assert_failure(code);

    // The later unit was still woven and cached.
    assert!(root.join("cache/src/b/Two.php").as_std_path().exists());
    let message = String::from_utf8_lossy(&stderr);
    assert!(message.contains("1 unit(s) failed"), "stderr: {message}");
}

#[test]
fn memory_only_mode_weaves_without_writing() {
    let dir = TempDir::new().expect("tempdir");
    let root = utf8_root(&dir);
    write_file(&root.join("src/Greeter.php"), GREETER);
    let config_path = root.join("loom.json");
    // No cache_dir configured.
    write_file(
        &config_path,
        &format!(
            r#"{{
                "app_root": "{root}",
                "include_paths": ["src"],
                "aspects": [
                    {{
                        "name": "Logging",
                        "advisors": [
                            {{"pointcut": "execution(Demo\\Greeter->hello)", "phase": "around"}}
                        ]
                    }}
                ]
            }}"#
        ),
    );

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(
        args(&["loom", "--config", config_path.as_str(), "weave"]),
        &mut stdout,
        &mut stderr,
    );
    assert_success(code, &stderr);

    let summary = String::from_utf8_lossy(&stdout);
    assert!(
        summary.contains("would weave 1 of 1 unit(s)"),
        "summary: {summary}"
    );
    assert!(!root.join("cache").as_std_path().exists());
}

#[test]
fn inspect_prints_one_advisor_per_line() {
    let dir = TempDir::new().expect("tempdir");
    let root = utf8_root(&dir);
    write_file(&root.join("src/Greeter.php"), GREETER);
    write_file(&root.join("src/Bystander.php"), BYSTANDER);
    let config_path = root.join("loom.json");
    write_file(&config_path, &logging_config(&root));

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(
        args(&["loom", "--config", config_path.as_str(), "inspect"]),
        &mut stdout,
        &mut stderr,
    );
    assert_success(code, &stderr);

    let output = String::from_utf8_lossy(&stdout);
    let mut lines = output.lines();

    let advisor: serde_json::Value =
        serde_json::from_str(lines.next().expect("advisor line")).expect("json line");
    assert_eq!(advisor["id"], "advisor.Logging->0");
    assert_eq!(advisor["pointcut"], "execution(Demo\\Greeter->hello)");
    assert_eq!(advisor["phase"], "around");
    assert_eq!(advisor["priority"], 1);

    // Units follow in sorted path order; nothing is written.
    let bystander: serde_json::Value =
        serde_json::from_str(lines.next().expect("first unit line")).expect("json line");
    assert_eq!(bystander["path"], root.join("src/Bystander.php").as_str());
    assert_eq!(bystander["transformed"], false);

    let greeter: serde_json::Value =
        serde_json::from_str(lines.next().expect("second unit line")).expect("json line");
    assert_eq!(greeter["transformed"], true);
    assert!(!root.join("cache").as_std_path().exists());
}

#[test]
fn include_path_outside_the_root_aborts_the_run() {
    let dir = TempDir::new().expect("tempdir");
    let root = utf8_root(&dir);
    let config_path = root.join("loom.json");
    write_file(
        &config_path,
        &format!(
            r#"{{"app_root": "{root}", "cache_dir": "{root}/cache", "include_paths": ["/somewhere/else"]}}"#
        ),
    );

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(
        args(&["loom", "--config", config_path.as_str(), "weave"]),
        &mut stdout,
        &mut stderr,
    );
    assert_failure(code);
    let message = String::from_utf8_lossy(&stderr);
    assert!(
        message.contains("outside the application root"),
        "stderr: {message}"
    );
}

#[test]
fn missing_config_file_is_reported() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(
        args(&["loom", "--config", "/does/not/exist.json", "weave"]),
        &mut stdout,
        &mut stderr,
    );
    assert_failure(code);
    let message = String::from_utf8_lossy(&stderr);
    assert!(message.contains("failed to read configuration"), "stderr: {message}");
}

#[test]
fn usage_errors_are_printed_to_stderr() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(args(&["loom", "--bogus"]), &mut stdout, &mut stderr);
    assert_ne!(exit_repr(code), exit_repr(ExitCode::SUCCESS));
    assert!(stdout.is_empty());
    let message = String::from_utf8_lossy(&stderr);
    assert!(message.contains("--bogus"), "stderr: {message}");
}

#[test]
fn help_is_printed_to_stdout() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = loom_cli::run(args(&["loom", "--help"]), &mut stdout, &mut stderr);
    assert_success(code, &stderr);
    let help = String::from_utf8_lossy(&stdout);
    assert!(help.contains("weave"));
    assert!(help.contains("inspect"));
}

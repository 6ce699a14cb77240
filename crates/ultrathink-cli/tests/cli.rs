//! Integration tests for the ultrathink CLI
//!
//! Each test runs the built binary inside its own temp directory, so the
//! default config path and storage root resolve under that directory.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

fn run_ultrathink(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ultrathink"))
        .current_dir(dir)
        .args(args)
        .env_remove("ULTRATHINK_PACKAGE")
        .env_remove("ULTRATHINK_STORAGE_ROOT")
        .env_remove("ULTRATHINK_SENSITIVITY")
        .env("ULTRATHINK_RUN_DOCTESTS", "0")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute ultrathink")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_package(dir: &Path, init: &str) {
    let pkg = dir.join("src").join("demo");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(pkg.join("__init__.py"), init).unwrap();
}

const DOCUMENTED: &str = r#""""Demo package for CLI tests."""
__version__ = "1.0.0"


def run(path: str) -> int:
    """Run the pipeline over a path.

    Args:
        path: Input location.

    Returns:
        Exit status of the run.

    Examples:
        >>> run("x")
        0
    """
    return 0
"#;

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    let output = run_ultrathink(dir.path(), &["--help"]);
    assert!(output.status.success());
    let help = stdout(&output);
    let commands = [
        "validate",
        "validate-help",
        "build",
        "check-completeness",
        "snapshot",
        "diff",
        "versions",
        "deprecations",
    ];
    for cmd in commands {
        assert!(help.contains(cmd), "missing {cmd} in help:\n{help}");
    }
}

#[test]
fn test_setup_writes_config_and_storage() {
    let dir = TempDir::new().unwrap();
    let output = run_ultrathink(dir.path(), &["setup", "--package", "demo"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let config =
        fs::read_to_string(dir.path().join("docs/ultrathink/config/ultrathink.toml")).unwrap();
    assert!(config.contains("name = \"demo\""));
    let storage = dir.path().join("docs/ultrathink/storage");
    assert!(storage.join("version_tracking.db").exists());
    assert!(storage.join("api_snapshots").is_dir());

    // Later commands pick the package up from the written config.
    write_package(dir.path(), DOCUMENTED);
    let output = run_ultrathink(dir.path(), &["introspect"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn test_snapshot_diff_and_versions() {
    let dir = TempDir::new().unwrap();
    write_package(dir.path(), DOCUMENTED);
    let output = run_ultrathink(
        dir.path(),
        &["snapshot", "--package", "demo", "--version", "1.0.0", "--register"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("API snapshot created"));

    let helper = "def helper():\n    \"\"\"Helper added in the next release.\"\"\"\n";
    write_package(dir.path(), &format!("{DOCUMENTED}\n\n{helper}"));
    let output = run_ultrathink(
        dir.path(),
        &["snapshot", "-p", "demo", "--version", "1.1.0", "--register"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run_ultrathink(
        dir.path(),
        &["diff", "-p", "demo", "--from-version", "1.0.0", "--to-version", "1.1.0", "--record"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Total changes: 1"));
    assert!(text.contains("Breaking changes: 0"));
    assert!(text.contains("minor -> 1.1.0"));
    assert!(text.contains("Recorded 1 changes"));

    let output = run_ultrathink(dir.path(), &["versions", "current"]);
    assert_eq!(stdout(&output).trim(), "1.1.0");
    let output = run_ultrathink(dir.path(), &["versions", "next", "--bump", "major"]);
    assert_eq!(stdout(&output).trim(), "2.0.0");
}

#[test]
fn test_diff_of_unknown_version_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_ultrathink(
        dir.path(),
        &["diff", "-p", "demo", "--from-version", "0.1.0", "--to-version", "0.2.0"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No snapshot found for version 0.1.0"));
}

#[test]
fn test_check_completeness_fails_for_bare_package() {
    let dir = TempDir::new().unwrap();
    write_package(dir.path(), "def run(path):\n    return 0\n");
    let output =
        run_ultrathink(dir.path(), &["check-completeness", "-p", "demo", "--threshold", "0.9"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("# Documentation Completeness Report"));
}

#[test]
fn test_check_staged_files_with_explicit_list() {
    let dir = TempDir::new().unwrap();
    write_package(dir.path(), "def bare():\n    pass\n");
    let staged = ["check-staged-files", "-p", "demo", "src/demo/__init__.py"];
    let output = run_ultrathink(dir.path(), &staged);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("bare has no docstring"));

    write_package(dir.path(), DOCUMENTED);
    let output = run_ultrathink(dir.path(), &staged);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
}

#[test]
fn test_missing_package_is_an_error() {
    let dir = TempDir::new().unwrap();
    let output = run_ultrathink(dir.path(), &["introspect"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no package given"));
}

#[test]
fn test_validate_help_fails_when_a_help_page_changes() {
    let dir = TempDir::new().unwrap();
    write_package(dir.path(), DOCUMENTED);
    let output = run_ultrathink(dir.path(), &["validate-help", "-p", "demo"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("No reference snapshot found"));

    let output = run_ultrathink(dir.path(), &["validate-help", "-p", "demo"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("help() output unchanged"));

    write_package(dir.path(), &DOCUMENTED.replace("Run the pipeline", "Execute the pipeline"));
    let output = run_ultrathink(dir.path(), &["validate-help", "-p", "demo"]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("help() output changed"));
    assert!(text.contains("modified: 1"));
    assert!(text.contains("  - run"));
}

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

#[test]
fn run_loads_default_dotenv_file() {
    let dir = TempDir::new().expect("temp dir");
    write_file(&dir.path().join(".env"), "ENVLINE_CLI_DEFAULT=from_default\n");

    let output = run_dotenv(
        dir.path(),
        &["run", "--", "printenv", "ENVLINE_CLI_DEFAULT"],
        None,
    );

    assert_success(&output);
    assert_eq!(stdout_trimmed(&output), "from_default");
}

#[test]
fn run_strips_quotes_from_selected_file() {
    let dir = TempDir::new().expect("temp dir");
    write_file(
        &dir.path().join("custom.env"),
        "ENVLINE_CLI_QUOTED = \"hello world\"\n",
    );

    let output = run_dotenv(
        dir.path(),
        &["run", "-f", "custom.env", "printenv", "ENVLINE_CLI_QUOTED"],
        None,
    );

    assert_success(&output);
    assert_eq!(stdout_trimmed(&output), "hello world");
}

#[test]
fn run_keeps_existing_environment_values() {
    let dir = TempDir::new().expect("temp dir");
    write_file(&dir.path().join(".env"), "ENVLINE_CLI_EXISTING=from_file\n");

    let output = run_dotenv(
        dir.path(),
        &["run", "--", "printenv", "ENVLINE_CLI_EXISTING"],
        Some(("ENVLINE_CLI_EXISTING", "from_env")),
    );

    assert_success(&output);
    assert_eq!(stdout_trimmed(&output), "from_env");
}

#[test]
fn run_fails_when_file_is_missing() {
    let dir = TempDir::new().expect("temp dir");

    let output = run_dotenv(
        dir.path(),
        &["run", "-f", "missing.env", "--", "printenv", "HOME"],
        None,
    );

    assert!(
        !output.status.success(),
        "expected missing file to fail: stdout={:?}, stderr={:?}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("file does not exist"),
        "expected missing-file message in stderr: {stderr:?}"
    );
}

#[test]
fn get_prints_value_or_exits_nonzero() {
    let dir = TempDir::new().expect("temp dir");
    write_file(&dir.path().join(".env"), "URL=http://x?a=1\n");

    let found = run_dotenv(dir.path(), &["get", "URL"], None);
    assert_success(&found);
    assert_eq!(stdout_trimmed(&found), "http://x?a=1");

    let missing = run_dotenv(dir.path(), &["get", "NOPE"], None);
    assert_eq!(missing.status.code(), Some(1));
    assert!(missing.stdout.is_empty());
}

#[test]
fn list_prints_entries_in_file_order() {
    let dir = TempDir::new().expect("temp dir");
    write_file(
        &dir.path().join(".env"),
        "B=1\n# comment\nA='2'\nnot an entry\nB=3\n",
    );

    let output = run_dotenv(dir.path(), &["list"], None);

    assert_success(&output);
    assert_eq!(stdout_trimmed(&output), "B=3\nA=2");
}

#[test]
fn unknown_subcommand_fails() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_dotenv(dir.path(), &["load"], None);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown subcommand `load`"), "{stderr:?}");
}

fn run_dotenv(dir: &Path, args: &[&str], env_pair: Option<(&str, &str)>) -> Output {
    let mut command = Command::new(dotenv_bin());
    command.current_dir(dir).args(args).env_remove("RUST_LOG");
    if let Some((key, value)) = env_pair {
        command.env(key, value);
    }
    command.output().expect("failed to run dotenv binary")
}

fn stdout_trimmed(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout)
        .trim_end()
        .to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "expected success: stdout={:?}, stderr={:?}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn dotenv_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dotenv"))
}

fn write_file(path: &Path, content: &str) {
    std::fs::write(path, content).expect("failed to write fixture file");
}

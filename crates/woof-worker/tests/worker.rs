//! Tests for the isolated-cell worker, both on its own and driven by a run.

#![allow(deprecated)] // cargo_bin is deprecated but still works

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use woof_core::state::{Output, read_log};
use woof_core::{RunOptions, Runner};

fn worker() -> Command {
    Command::cargo_bin("woof-worker").unwrap()
}

fn worker_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_woof-worker"))
}

// =============================================================================
// Direct invocation
// =============================================================================

#[test]
fn test_worker_runs_body_from_stdin() {
    worker()
        .write_stdin("let x = 3\nprint x is $x\neprint note\n")
        .assert()
        .success()
        .stdout("x is 3\n")
        .stderr(predicate::str::contains("note"));
}

#[test]
fn test_worker_reports_failure() {
    worker()
        .write_stdin("print before\nfail broken\n")
        .assert()
        .code(1)
        .stdout("before\n")
        .stderr(predicate::str::contains("ExecutionError: line 2: broken"));
}

#[test]
fn test_worker_denies_files_without_flag() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("out.txt");

    worker()
        .write_stdin(format!("write {} data\n", target.display()))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PolicyError: File access not allowed"));
    assert!(!target.exists());
}

#[test]
fn test_worker_writes_files_with_flag() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("out.txt");

    worker()
        .arg("--allow-files")
        .write_stdin(format!("write {} data\n", target.display()))
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&target).unwrap(), "data");
}

#[test]
fn test_worker_starts_with_empty_namespace() {
    worker()
        .write_stdin("print $anything\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ExecutionError"));
}

// =============================================================================
// Isolated cells in a run
// =============================================================================

struct IsolatedNotebook {
    dir: TempDir,
    path: PathBuf,
}

impl IsolatedNotebook {
    fn new(policy: &str, cells: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("iso.woofnb");
        fs::write(&path, format!("%WOOFNB 1.0\nio_policy:\n{}\n{}", policy, cells)).unwrap();
        Self { dir, path }
    }

    fn run(&self) -> (woof_core::RunResult, Vec<Vec<Output>>) {
        let result = Runner::new()
            .with_worker(worker_path())
            .run_file(&self.path, &RunOptions::default())
            .unwrap();
        let outputs = read_log(&result.log_path)
            .unwrap()
            .into_iter()
            .map(|r| r.outputs)
            .collect();
        (result, outputs)
    }
}

#[test]
fn test_isolated_cell_runs_in_worker() {
    let nb = IsolatedNotebook::new(
        "  allow_files: false",
        "```cell id=iso type=code sidefx=isolated\nprint isolated\n```\n",
    );
    let (result, outputs) = nb.run();

    assert!(result.success());
    assert_eq!(outputs[0], vec![Output::stdout("isolated\n")]);
}

#[test]
fn test_isolated_cell_does_not_share_namespace() {
    let nb = IsolatedNotebook::new(
        "  allow_files: false",
        "```cell id=setup type=code\nlet x = 1\n```\n\
         ```cell id=iso type=code sidefx=isolated\nlet y = 2\nprint $x\n```\n\
         ```cell id=after type=code\nprint $y\n```\n",
    );
    let (result, outputs) = nb.run();

    assert_eq!(result.failed, vec!["iso", "after"]);
    assert!(matches!(
        outputs[1].last(),
        Some(Output::Error { ename, evalue, .. })
            if ename == "SubprocessError" && evalue == "returncode=1"
    ));
}

#[test]
fn test_isolated_cell_gets_no_file_grant() {
    // `sidefx=isolated` requests isolation, not file access.
    let nb = IsolatedNotebook::new("  allow_files: true", "");
    let target = nb.dir.path().join("iso.txt");
    fs::write(
        &nb.path,
        format!(
            "%WOOFNB 1.0\nio_policy:\n  allow_files: true\n\
             ```cell id=iso type=code sidefx=isolated\nwrite {} from worker\n```\n",
            target.display()
        ),
    )
    .unwrap();

    let (result, outputs) = nb.run();
    assert_eq!(result.failed, vec!["iso"]);
    assert!(matches!(
        &outputs[0][0],
        Output::Stream { text, .. } if text.contains("PolicyError: File access not allowed")
    ));
    assert!(!target.exists());
}

//! End-to-end tests for woof CLI commands.
//!
//! These tests verify that the CLI produces expected output and exit codes
//! when run against real notebook files.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin for tests

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a temporary directory with a test notebook.
struct TestNotebook {
    _temp_dir: TempDir,
    notebook_path: PathBuf,
}

impl TestNotebook {
    fn new(filename: &str, source: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let notebook_path = temp_dir.path().join(filename);
        fs::write(&notebook_path, source).expect("Failed to write notebook");

        Self {
            _temp_dir: temp_dir,
            notebook_path,
        }
    }

    fn path(&self) -> &PathBuf {
        &self.notebook_path
    }

    fn dir(&self) -> &Path {
        self._temp_dir.path()
    }

    fn log_path(&self) -> PathBuf {
        let mut name = self.notebook_path.as_os_str().to_owned();
        name.push(".out");
        PathBuf::from(name)
    }
}

fn woof() -> Command {
    Command::cargo_bin("woof").unwrap()
}

/// Cell ids recorded in a sidecar log, in order.
fn logged_cells(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .expect("Failed to read sidecar log")
        .lines()
        .map(|line| {
            let record: serde_json::Value = serde_json::from_str(line).expect("Invalid log line");
            record["cell"].as_str().unwrap().to_string()
        })
        .collect()
}

/// A small notebook with a data -> code -> test chain and one unrelated cell.
fn chain_notebook() -> String {
    r#"%WOOFNB 1.0
name: chain

```cell id=intro type=md
# Mean
```

```cell id=data1 type=data
[2, 4, 6]
```

```cell id=mean type=code deps=data1
let mean = 4
print mean of $data1 is $mean
```

```cell id=test1 type=test deps=mean
assert mean == 4
```

```cell id=extra type=code
print extra
```
"#
    .to_string()
}

// =============================================================================
// Run Command Tests
// =============================================================================

#[test]
fn test_run_all_cells() {
    let nb = TestNotebook::new("chain.woofnb", &chain_notebook());

    woof()
        .arg("run")
        .arg(nb.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("mean of [2,4,6] is 4"))
        .stdout(predicate::str::contains("Completed"));

    assert_eq!(logged_cells(&nb.log_path()), ["data1", "mean", "test1", "extra"]);
}

#[test]
fn test_run_log_records_are_json_lines() {
    let nb = TestNotebook::new("chain.woofnb", &chain_notebook());
    woof().arg("run").arg(nb.path()).assert().success();

    let text = fs::read_to_string(nb.log_path()).unwrap();
    let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    assert_eq!(first["cell"], "data1");
    assert_eq!(first["outputs"][0]["output_type"], "execute_result");
    assert!(first["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn test_run_failure_exits_one() {
    let nb = TestNotebook::new(
        "fail.woofnb",
        "%WOOFNB 1.0\n```cell id=bad type=code\nfail boom\n```\n```cell id=good type=code\nprint fine\n```\n",
    );

    woof()
        .arg("run")
        .arg(nb.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ExecutionError"))
        .stdout(predicate::str::contains("Failed"))
        .stdout(predicate::str::contains("fine"));

    assert_eq!(logged_cells(&nb.log_path()), ["bad", "good"]);
}

#[test]
fn test_run_selected_cell_with_dependencies() {
    let nb = TestNotebook::new("chain.woofnb", &chain_notebook());

    woof()
        .args(["run", "--cell", "test1"])
        .arg(nb.path())
        .assert()
        .success();

    assert_eq!(logged_cells(&nb.log_path()), ["data1", "mean", "test1"]);
}

#[test]
fn test_run_selected_cells_without_dependencies() {
    let nb = TestNotebook::new("chain.woofnb", &chain_notebook());

    woof()
        .args(["run", "--cell", "extra", "--cell", "data1", "--no-deps"])
        .arg(nb.path())
        .assert()
        .success();

    assert_eq!(logged_cells(&nb.log_path()), ["data1", "extra"]);
}

#[test]
fn test_no_deps_requires_cell() {
    let nb = TestNotebook::new("chain.woofnb", &chain_notebook());

    woof()
        .args(["run", "--no-deps"])
        .arg(nb.path())
        .assert()
        .code(2);
}

#[test]
fn test_run_custom_log_path() {
    let nb = TestNotebook::new("chain.woofnb", &chain_notebook());
    let log = nb.dir().join("logs").join("run.jsonl");

    woof()
        .arg("run")
        .arg(nb.path())
        .arg("--log")
        .arg(&log)
        .assert()
        .success();

    assert_eq!(logged_cells(&log).len(), 4);
    assert!(!nb.log_path().exists());
}

#[test]
fn test_run_cycle_reports_hint() {
    let nb = TestNotebook::new(
        "cycle.woofnb",
        "%WOOFNB 1.0\n```cell id=a type=code deps=b\n```\n```cell id=b type=code deps=a\n```\n",
    );

    woof()
        .arg("run")
        .arg(nb.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cyclic dependency"))
        .stderr(predicate::str::contains("hint"));

    assert!(!nb.log_path().exists());
}

#[test]
fn test_run_missing_file_fails() {
    woof()
        .args(["run", "/nonexistent/path/missing.woofnb"])
        .assert()
        .failure();
}

#[test]
fn test_second_run_uses_cache() {
    let source = chain_notebook().replace("name: chain", "execution:\n  cache: content-hash");
    let nb = TestNotebook::new("cached.woofnb", &source);

    woof().arg("run").arg(nb.path()).assert().success();
    woof()
        .arg("run")
        .arg(nb.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cached"));

    assert!(nb.dir().join(".woof-cache").join("cached").is_dir());
}

// =============================================================================
// Test Command Tests
// =============================================================================

#[test]
fn test_test_command_runs_test_closure() {
    let nb = TestNotebook::new("chain.woofnb", &chain_notebook());

    woof()
        .arg("test")
        .arg(nb.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("tests"));

    assert_eq!(logged_cells(&nb.log_path()), ["data1", "mean", "test1"]);
}

#[test]
fn test_test_command_failing_assertion() {
    let source = chain_notebook().replace("assert mean == 4", "assert mean == 5");
    let nb = TestNotebook::new("chain.woofnb", &source);

    woof()
        .arg("test")
        .arg(nb.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("AssertionError"));
}

// =============================================================================
// Graph and Lint Command Tests
// =============================================================================

#[test]
fn test_graph_prints_dependencies_first() {
    let nb = TestNotebook::new(
        "graph.woofnb",
        "%WOOFNB 1.0\n\
         ```cell id=report type=code deps=load\nprint report\n```\n\
         ```cell id=load type=code\nprint load\n```\n",
    );

    woof()
        .arg("graph")
        .arg(nb.path())
        .assert()
        .success()
        .stdout("load\nreport\n");
}

#[test]
fn test_graph_rejects_cycle() {
    let nb = TestNotebook::new(
        "cycle.woofnb",
        "%WOOFNB 1.0\n```cell id=a type=code deps=b\n```\n```cell id=b type=code deps=a\n```\n",
    );

    woof()
        .arg("graph")
        .arg(nb.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cyclic dependency"));
}

#[test]
fn test_lint_clean_notebook() {
    let nb = TestNotebook::new("chain.woofnb", &chain_notebook());

    woof()
        .arg("lint")
        .arg(nb.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("no problems found"));
}

#[test]
fn test_lint_reports_every_problem() {
    let nb = TestNotebook::new(
        "broken.woofnb",
        "%WOOFNB 1.0\n\
         ```cell id=a type=code deps=ghost\n```\n\
         ```cell id=a type=code\n```\n",
    );

    woof()
        .arg("lint")
        .arg(nb.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("duplicate cell id: a"))
        .stdout(predicate::str::contains("missing id 'ghost'"))
        .stdout(predicate::str::contains("2 problem(s)"));
}

// =============================================================================
// CLI Help Tests
// =============================================================================

#[test]
fn test_help_lists_commands() {
    woof()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("test"))
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("lint"));
}

#[test]
fn test_graph_help_matches_output() {
    woof()
        .args(["graph", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dependency-first order, one per line"));
}

#[test]
fn test_unknown_command_is_usage_error() {
    woof().arg("frobnicate").assert().code(2);
}

//! Integration tests for whole-notebook runs.
//!
//! Tests the complete workflow from reading a `.woofnb` file to the sidecar
//! log a run leaves behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tempfile::TempDir;
use woof_core::interp::{ExecError, Interpreter, Session};
use woof_core::state::{LogRecord, Output, read_log};
use woof_core::{Error, RunMode, RunOptions, Runner, read_file};

// =============================================================================
// Test Helpers
// =============================================================================

/// A notebook file in its own temporary directory.
struct TestNotebook {
    _dir: TempDir,
    path: PathBuf,
}

impl TestNotebook {
    fn new(source: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create test directory");
        let path = dir.path().join("analysis.woofnb");
        fs::write(&path, source).expect("Failed to write notebook file");
        Self { _dir: dir, path }
    }

    fn log_path(&self) -> PathBuf {
        self.path.with_file_name("analysis.woofnb.out")
    }

    fn run(&self, mode: RunMode) -> woof_core::Result<woof_core::RunResult> {
        Runner::new().run_file(&self.path, &RunOptions::new(mode))
    }

    fn records(&self) -> Vec<LogRecord> {
        read_log(self.log_path()).expect("Failed to read sidecar log")
    }
}

fn logged_cells(records: &[LogRecord]) -> Vec<&str> {
    records.iter().map(|r| r.cell.as_str()).collect()
}

const CHAIN: &str = r#"%WOOFNB 1.0
name: chain
execution:
  order: linear

```cell id=intro type=md
# Mean of a list
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

```cell id=unrelated type=code
print unrelated
```
"#;

// =============================================================================
// Planning through runs
// =============================================================================

#[test]
fn test_run_all_in_file_order() {
    let nb = TestNotebook::new(CHAIN);
    let result = nb.run(RunMode::All).unwrap();

    assert!(result.success());
    assert_eq!(result.total, 5);
    assert_eq!(
        logged_cells(&nb.records()),
        vec!["data1", "mean", "test1", "unrelated"]
    );
}

#[test]
fn test_tests_mode_runs_closure_only() {
    let nb = TestNotebook::new(CHAIN);
    let result = nb.run(RunMode::Tests).unwrap();

    assert!(result.success());
    assert_eq!(result.mode, "tests");
    assert_eq!(logged_cells(&nb.records()), vec!["data1", "mean", "test1"]);
}

#[test]
fn test_selection_with_and_without_dependencies() {
    let nb = TestNotebook::new(CHAIN);

    let with_deps = nb.run(RunMode::select(["test1"], true)).unwrap();
    assert!(with_deps.success());
    assert_eq!(logged_cells(&nb.records()), vec!["data1", "mean", "test1"]);

    // Without `mean` having run, the assertion has nothing to check.
    let alone = nb.run(RunMode::select(["test1"], false)).unwrap();
    assert_eq!(alone.failed, vec!["test1"]);
    assert_eq!(logged_cells(&nb.records()), vec!["test1"]);
}

#[test]
fn test_log_is_reset_each_run() {
    let nb = TestNotebook::new(CHAIN);
    nb.run(RunMode::All).unwrap();
    nb.run(RunMode::select(["data1"], false)).unwrap();

    assert_eq!(logged_cells(&nb.records()), vec!["data1"]);
}

#[test]
fn test_cycle_aborts_before_logging() {
    let nb = TestNotebook::new(
        "%WOOFNB 1.0\n```cell id=a type=code deps=b\nprint a\n```\n```cell id=b type=code deps=a\nprint b\n```\n",
    );

    let err = nb.run(RunMode::All).unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));
    assert!(!nb.log_path().exists());
}

#[test]
fn test_missing_dependency_aborts() {
    let nb = TestNotebook::new("%WOOFNB 1.0\n```cell id=a type=code deps=b\nprint a\n```\n");

    match nb.run(RunMode::All) {
        Err(Error::MissingDependency { cell, dependency }) => {
            assert_eq!(cell, "a");
            assert_eq!(dependency, "b");
        }
        other => panic!("expected a missing dependency, got {:?}", other),
    }
    assert!(!nb.log_path().exists());
}

#[test]
fn test_graph_order_keeps_file_order() {
    let nb = TestNotebook::new(
        "%WOOFNB 1.0\nexecution:\n  order: graph\n\
         ```cell id=report type=code deps=load\nprint report\n```\n\
         ```cell id=load type=code\nprint load\n```\n",
    );

    nb.run(RunMode::All).unwrap();
    assert_eq!(logged_cells(&nb.records()), vec!["report", "load"]);
}

// =============================================================================
// Cell semantics
// =============================================================================

#[test]
fn test_shared_namespace_flows_between_cells() {
    let nb = TestNotebook::new(CHAIN);
    nb.run(RunMode::All).unwrap();

    let records = nb.records();
    let mean = records.iter().find(|r| r.cell == "mean").unwrap();
    assert_eq!(mean.outputs, vec![Output::stdout("mean of [2,4,6] is 4\n")]);
    assert!(!mean.cached);
}

#[test]
fn test_data_cell_formats() {
    let nb = TestNotebook::new(
        "%WOOFNB 1.0\n\
         ```cell id=cfg type=data\nrate: 0.5\nnames: [a, b]\n```\n\
         ```cell id=raw-notes type=data\nfree: [text\n```\n\
         ```cell id=use type=code\nprint $cfg ${raw-notes}\n```\n",
    );

    assert!(nb.run(RunMode::All).unwrap().success());
    let records = nb.records();
    assert_eq!(
        records[2].outputs,
        vec![Output::stdout("{\"names\":[\"a\",\"b\"],\"rate\":0.5} free: [text\n")]
    );
}

#[test]
fn test_timeout_fails_the_cell_and_run_continues() {
    let nb = TestNotebook::new(
        "%WOOFNB 1.0\n\
         ```cell id=slow type=code timeout=1\nsleep 10000\n```\n\
         ```cell id=after type=code\nprint still running\n```\n",
    );

    let result = nb.run(RunMode::All).unwrap();
    assert_eq!(result.failed, vec!["slow"]);

    let records = nb.records();
    assert!(matches!(&records[0].outputs[0], Output::Error { ename, .. } if ename == "TimeoutExpired"));
    assert_eq!(records[1].outputs, vec![Output::stdout("still running\n")]);
}

/// Fails on its first two calls.
struct FlakyTwice {
    calls: AtomicU32,
}

impl Interpreter for FlakyTwice {
    fn name(&self) -> &str {
        "flaky"
    }

    fn run(&self, _body: &str, session: &mut Session<'_>) -> Result<(), ExecError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= 2 {
            return Err(ExecError::Execution(format!("transient failure {}", call)));
        }
        session.print("recovered\n");
        Ok(())
    }
}

#[test]
fn test_retry_logs_only_final_attempt() {
    let nb = TestNotebook::new("%WOOFNB 1.0\n```cell id=flaky type=code retries=2\nwhatever\n```\n");
    let interpreter = Arc::new(FlakyTwice {
        calls: AtomicU32::new(0),
    });

    let result = Runner::with_interpreter(interpreter.clone())
        .run_file(&nb.path, &RunOptions::default())
        .unwrap();

    assert!(result.success());
    assert_eq!(interpreter.calls.load(Ordering::SeqCst), 3);
    let records = nb.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outputs, vec![Output::stdout("recovered\n")]);
}

#[test]
fn test_notebook_is_not_modified_by_a_run() {
    let nb = TestNotebook::new(CHAIN);
    let before = read_file(&nb.path).unwrap();
    Runner::new().run(&before, &RunOptions::default()).unwrap();

    assert_eq!(fs::read_to_string(&nb.path).unwrap(), CHAIN);
    assert_eq!(before.cells.len(), 5);
}

#[test]
fn test_unknown_selection_runs_nothing() {
    let nb = TestNotebook::new(CHAIN);
    let result = nb.run(RunMode::select(["ghost"], true)).unwrap();

    assert!(result.success());
    assert_eq!(result.total, 0);
    assert!(nb.records().is_empty());
    assert!(Path::new(&result.log_path).exists());
}

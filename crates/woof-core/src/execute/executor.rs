//! Single-cell executor.
//!
//! Chooses an execution mode per cell and drives the retry loop:
//!
//! - `data` cells are parsed and bound into the namespace, no retries
//! - `bash` cells and `sidefx=isolated` cells run in an external process
//! - everything else runs in-process against the shared namespace

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::interp::{ExecError, Interpreter, Namespace, ScriptInterpreter, Session};
use crate::notebook::{Cell, CellType, IoPolicy, SideEffect};
use crate::state::{Output, has_error, stream_records};

use super::context::{CancelToken, Watchdog};
use super::policy::{Capabilities, shell_granted};
use super::process::ProcessRunner;

/// Result of executing one cell: the final attempt's records.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub outputs: Vec<Output>,
    /// Attempts made; zero when the cell was rejected before running.
    pub attempts: u32,
}

impl ExecutionOutcome {
    fn rejected(error: ExecError) -> Self {
        Self {
            outputs: vec![error.into_output(Vec::new())],
            attempts: 0,
        }
    }

    /// Failure iff at least one `error` record is present.
    pub fn failed(&self) -> bool {
        has_error(&self.outputs)
    }
}

/// Executes cells under a document I/O policy.
pub struct CellExecutor {
    interpreter: Arc<dyn Interpreter>,
    policy: IoPolicy,
    worker_path: Option<PathBuf>,
}

impl CellExecutor {
    pub fn new(policy: IoPolicy) -> Self {
        Self::with_interpreter(policy, Arc::new(ScriptInterpreter))
    }

    pub fn with_interpreter(policy: IoPolicy, interpreter: Arc<dyn Interpreter>) -> Self {
        Self {
            interpreter,
            policy,
            worker_path: None,
        }
    }

    /// Use a specific worker binary for isolated cells.
    pub fn with_worker(mut self, path: impl Into<PathBuf>) -> Self {
        self.worker_path = Some(path.into());
        self
    }

    /// Execute `cell`.
    ///
    /// Shared-mode cells get exclusive use of `namespace` for the duration of
    /// each attempt; isolated cells never see it.
    pub fn execute(&self, cell: &Cell, namespace: &mut Namespace) -> ExecutionOutcome {
        if cell.kind == CellType::Data {
            return ExecutionOutcome {
                outputs: vec![bind_data(cell, namespace)],
                attempts: 1,
            };
        }

        let retries = cell.header.retries();
        let timeout = cell.header.timeout();

        if cell.kind == CellType::Bash {
            if !shell_granted(&self.policy, cell) {
                tracing::debug!("Shell denied for cell '{}'", cell.id);
                return ExecutionOutcome::rejected(ExecError::Policy("Shell not allowed".into()));
            }
            let runner = ProcessRunner::shell();
            return with_retries(&cell.id, retries, || isolated_attempt(&runner, &cell.body, timeout));
        }

        let sidefx = cell.header.sidefx();
        if sidefx == SideEffect::Isolated {
            // The worker gets the same grants a shared cell would.
            let capabilities = Capabilities::grant(&self.policy, sidefx);
            let runner = match ProcessRunner::worker(self.worker_path.as_deref(), &capabilities) {
                Ok(runner) => runner,
                Err(e) => return ExecutionOutcome::rejected(ExecError::Subprocess(e.to_string())),
            };
            return with_retries(&cell.id, retries, || isolated_attempt(&runner, &cell.body, timeout));
        }

        with_retries(&cell.id, retries, || {
            self.shared_attempt(cell, sidefx, timeout, namespace)
        })
    }

    /// One in-process attempt. The capability token and the watchdog live
    /// exactly as long as the attempt.
    fn shared_attempt(
        &self,
        cell: &Cell,
        sidefx: SideEffect,
        timeout: Option<Duration>,
        namespace: &mut Namespace,
    ) -> Vec<Output> {
        let cancel = CancelToken::new();
        let watchdog = timeout.map(|t| Watchdog::arm(t, cancel.clone()));
        let mut session = Session::new(namespace, Capabilities::grant(&self.policy, sidefx), cancel.clone());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.interpreter.run(&cell.body, &mut session)
        }))
        .unwrap_or_else(|_| {
            Err(ExecError::Execution(format!(
                "interpreter '{}' panicked",
                self.interpreter.name()
            )))
        });
        drop(watchdog);

        // A body that ignored cancellation still overran its bound.
        let result = match (cancel.is_cancelled(), timeout) {
            (true, Some(t)) => Err(ExecError::Timeout(t.as_secs())),
            _ => result,
        };

        let (stdout, stderr) = session.into_streams();
        let mut outputs = Vec::new();
        if !stdout.is_empty() {
            outputs.push(Output::stdout(stdout));
        }
        if let Err(e) = result {
            outputs.push(e.into_output(Vec::new()));
        }
        if !stderr.is_empty() {
            outputs.push(Output::stderr(stderr));
        }
        outputs
    }
}

/// Run up to `retries + 1` attempts, stopping at the first without an
/// error record. The last attempt made is the outcome.
fn with_retries(
    cell_id: &str,
    retries: u32,
    mut attempt: impl FnMut() -> Vec<Output>,
) -> ExecutionOutcome {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let outputs = attempt();
        if !has_error(&outputs) || attempts > retries {
            return ExecutionOutcome { outputs, attempts };
        }
        tracing::debug!("Cell '{}' failed attempt {}, retrying", cell_id, attempts);
    }
}

fn isolated_attempt(runner: &ProcessRunner, body: &str, timeout: Option<Duration>) -> Vec<Output> {
    let output = match runner.run(body, timeout) {
        Ok(output) => output,
        Err(e) => return vec![ExecError::Subprocess(e.to_string()).into_output(Vec::new())],
    };

    let mut records = stream_records(&output.stdout, &output.stderr);
    match output.status {
        None => {
            let secs = timeout.map(|t| t.as_secs()).unwrap_or_default();
            records.push(ExecError::Timeout(secs).into_output(Vec::new()));
        }
        Some(status) if !status.success() => {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            records.push(
                ExecError::Subprocess(format!("returncode={}", code)).into_output(Vec::new()),
            );
        }
        Some(_) => {}
    }
    records
}

/// Parse a data cell body: JSON first, then YAML, else the raw text.
pub fn parse_data(body: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value;
    }
    if let Ok(value) = serde_yaml::from_str::<Value>(body) {
        return value;
    }
    Value::String(body.to_string())
}

/// Bind a data cell's value into `namespace` and describe it.
pub fn bind_data(cell: &Cell, namespace: &mut Namespace) -> Output {
    let value = parse_data(&cell.body);
    let repr = value.to_string();
    namespace.bind_data(&cell.id, value);
    Output::ExecuteResult { repr }
}

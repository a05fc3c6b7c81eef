//! The interpreter boundary.
//!
//! The engine never evaluates cell bodies itself. Shared-mode cells are
//! handed to an [`Interpreter`] together with a [`Session`]: exclusive access
//! to the run's [`Namespace`], the attempt's capability token, capture
//! buffers and the cancellation token driven by the timeout watchdog.

mod script;

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::execute::{Capabilities, CancelToken};
use crate::state::Output;

pub use script::ScriptInterpreter;

/// A per-cell failure, recorded as an `error` output rather than aborting
/// the run.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A capability was exercised without being granted.
    #[error("{0}")]
    Policy(String),

    /// The attempt exceeded its bound.
    #[error("cell exceeded its {0}s timeout")]
    Timeout(u64),

    /// The cell body raised or terminated abnormally.
    #[error("{0}")]
    Execution(String),

    /// An `assert` in the cell body did not hold.
    #[error("{0}")]
    Assertion(String),

    /// An external process failed.
    #[error("{0}")]
    Subprocess(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Error kind as written to the `ename` field.
    pub fn ename(&self) -> &'static str {
        match self {
            ExecError::Policy(_) => "PolicyError",
            ExecError::Timeout(_) => "TimeoutExpired",
            ExecError::Execution(_) => "ExecutionError",
            ExecError::Assertion(_) => "AssertionError",
            ExecError::Subprocess(_) => "SubprocessError",
            ExecError::Io(_) => "IoError",
        }
    }

    pub fn into_output(self, traceback: Vec<String>) -> Output {
        Output::Error {
            ename: self.ename().to_string(),
            evalue: self.to_string(),
            traceback,
        }
    }
}

/// Whether `name` can be bound as a plain identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Values shared across the shared-mode cells of one run.
///
/// `bindings` are plain names usable by cell bodies. `symbols` holds every
/// data cell's value by cell id, including ids that are not identifiers.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    bindings: BTreeMap<String, Value>,
    symbols: BTreeMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn symbol(&self, cell_id: &str) -> Option<&Value> {
        self.symbols.get(cell_id)
    }

    /// Bind a data cell's value: always as a symbol, and by name when the
    /// id is an identifier.
    pub fn bind_data(&mut self, cell_id: &str, value: Value) {
        if is_identifier(cell_id) {
            self.bindings.insert(cell_id.to_string(), value.clone());
        }
        self.symbols.insert(cell_id.to_string(), value);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.symbols.is_empty()
    }
}

/// Everything an interpreter may touch during one attempt.
pub struct Session<'a> {
    pub namespace: &'a mut Namespace,
    capabilities: Capabilities,
    cancel: CancelToken,
    stdout: String,
    stderr: String,
}

impl<'a> Session<'a> {
    pub fn new(namespace: &'a mut Namespace, capabilities: Capabilities, cancel: CancelToken) -> Self {
        Self {
            namespace,
            capabilities,
            cancel,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Fail with a timeout once the watchdog has fired.
    ///
    /// Interpreters call this between steps; it is the cancellation point
    /// for shared-mode timeouts.
    pub fn checkpoint(&self) -> Result<(), ExecError> {
        if self.cancel.is_cancelled() {
            Err(ExecError::Execution("execution cancelled".to_string()))
        } else {
            Ok(())
        }
    }

    /// Sleep cooperatively, failing if cancelled meanwhile.
    pub fn sleep(&self, duration: std::time::Duration) -> Result<(), ExecError> {
        if self.cancel.sleep(duration) {
            Ok(())
        } else {
            self.checkpoint()
        }
    }

    pub fn print(&mut self, text: &str) {
        self.stdout.push_str(text);
    }

    pub fn eprint(&mut self, text: &str) {
        self.stderr.push_str(text);
    }

    /// Captured `(stdout, stderr)`.
    pub fn into_streams(self) -> (String, String) {
        (self.stdout, self.stderr)
    }
}

/// Evaluates a shared-mode cell body.
pub trait Interpreter: Send + Sync {
    fn name(&self) -> &str;

    /// Run `body` to completion, reporting output through `session`.
    ///
    /// Long-running interpreters must call [`Session::checkpoint`]
    /// periodically so that timeouts can abort them.
    fn run(&self, body: &str, session: &mut Session<'_>) -> Result<(), ExecError>;
}

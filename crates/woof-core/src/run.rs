//! Run orchestration.
//!
//! One run: plan, reset the sidecar log, then for every planned cell in order
//! consult the cache, execute on a miss, append a log record and update the
//! cache. Planning errors abort before anything is written; cell failures
//! are recorded and the run moves on.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::execute::{CellExecutor, ExecutionCallback, bind_data};
use crate::interp::{Interpreter, Namespace, ScriptInterpreter};
use crate::notebook::{self, Cell, CellType, Notebook};
use crate::paths::NotebookDirs;
use crate::plan::{RunMode, plan};
use crate::state::{CacheKey, CacheStore, LogRecord, SidecarLog};

/// Per-invocation options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Log destination; defaults to `<notebook>.out`.
    pub log_path: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::All,
            log_path: None,
        }
    }
}

impl RunOptions {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            log_path: None,
        }
    }

    pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Cells executed in this run whose outcome failed, in execution order.
    pub failed: Vec<String>,
    /// Cells scheduled by the planner, skipped ones included.
    pub total: usize,
    pub mode: String,
    pub log_path: PathBuf,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }
}

/// Drives runs with a fixed interpreter and optional progress callback.
pub struct Runner {
    interpreter: Arc<dyn Interpreter>,
    callback: Option<Box<dyn ExecutionCallback>>,
    worker_path: Option<PathBuf>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self::with_interpreter(Arc::new(ScriptInterpreter))
    }

    pub fn with_interpreter(interpreter: Arc<dyn Interpreter>) -> Self {
        Self {
            interpreter,
            callback: None,
            worker_path: None,
        }
    }

    pub fn with_callback(mut self, callback: Box<dyn ExecutionCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Use a specific `woof-worker` binary for isolated cells.
    pub fn with_worker(mut self, path: impl Into<PathBuf>) -> Self {
        self.worker_path = Some(path.into());
        self
    }

    /// Read and run the notebook at `path`.
    pub fn run_file(&self, path: impl AsRef<Path>, options: &RunOptions) -> Result<RunResult> {
        let notebook = notebook::read_file(path)?;
        self.run(&notebook, options)
    }

    /// Run `notebook`. It is only read, never modified.
    pub fn run(&self, notebook: &Notebook, options: &RunOptions) -> Result<RunResult> {
        let plan = plan(notebook, &options.mode)?;

        let dirs = NotebookDirs::for_notebook(notebook.path.as_deref());
        let log_path = options.log_path.clone().unwrap_or_else(|| dirs.log_path.clone());
        let log = SidecarLog::reset(&log_path)?;

        let config = &notebook.config;
        let cache = config.cache_enabled().then(|| CacheStore::new(dirs));
        let mut executor = CellExecutor::with_interpreter(config.io_policy, self.interpreter.clone());
        if let Some(path) = &self.worker_path {
            executor = executor.with_worker(path);
        }

        // First occurrence wins, matching `Notebook::cell`.
        let cells: HashMap<&str, &Cell> = notebook
            .cells
            .iter()
            .rev()
            .map(|c| (c.id.as_str(), c))
            .collect();

        tracing::info!(
            "Running {} of {} cells (mode: {}, cache: {})",
            plan.len(),
            notebook.cells.len(),
            plan.mode,
            cache.is_some()
        );

        let mut namespace = Namespace::new();
        let mut failed = Vec::new();

        for id in &plan.order {
            let Some(&cell) = cells.get(id.as_str()) else {
                continue;
            };
            if cell.is_skipped() {
                tracing::debug!("Skipping cell '{}'", id);
                if let Some(cb) = &self.callback {
                    cb.on_cell_skipped(id);
                }
                continue;
            }

            let started = Utc::now();
            let transitive: BTreeMap<String, String> = plan
                .transitive_dependencies(id)
                .into_iter()
                .map(|dep| {
                    let body = cells.get(dep.as_str()).map(|c| c.body.clone()).unwrap_or_default();
                    (dep, body)
                })
                .collect();
            let key = CacheKey::derive(&cell.body, &transitive, &config.env, &config.parameters);

            if let Some(outputs) = cache.as_ref().and_then(|c| c.read(id, &key)) {
                tracing::debug!("Cache hit for cell '{}'", id);
                // Data values are needed downstream even when not re-run.
                if cell.kind == CellType::Data {
                    bind_data(cell, &mut namespace);
                }
                if let Some(cb) = &self.callback {
                    cb.on_cell_cached(id, &outputs);
                }
                // Only cells executed in this run count towards `failed`.
                log.append(&LogRecord::new(id.clone(), started, outputs).cached())?;
                continue;
            }

            if let Some(cb) = &self.callback {
                cb.on_cell_started(id);
            }
            let outcome = executor.execute(cell, &mut namespace);
            tracing::debug!(
                "Cell '{}' finished after {} attempt(s), failed: {}",
                id,
                outcome.attempts,
                outcome.failed()
            );

            log.append(&LogRecord::new(id.clone(), started, outcome.outputs.clone()))?;

            if let Some(cache) = &cache {
                if let Err(e) = cache.write(id, &key, &outcome.outputs) {
                    tracing::warn!("Failed to cache outputs of cell '{}': {}", id, e);
                }
            }

            if outcome.failed() {
                failed.push(id.clone());
                if let Some(cb) = &self.callback {
                    cb.on_cell_failed(id, &outcome.outputs);
                }
            } else if let Some(cb) = &self.callback {
                cb.on_cell_completed(id, &outcome.outputs);
            }
        }

        tracing::info!("Run finished: {} failed", failed.len());

        Ok(RunResult {
            failed,
            total: plan.len(),
            mode: plan.mode.label().to_string(),
            log_path,
        })
    }
}

/// Run `notebook` with the default interpreter.
pub fn run_notebook(notebook: &Notebook, options: &RunOptions) -> Result<RunResult> {
    Runner::new().run(notebook, options)
}

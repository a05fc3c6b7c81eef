//! Core engine for woof notebooks.
//!
//! This crate provides:
//! - Notebook model and `.woofnb` reader
//! - Dependency graph with cycle detection
//! - Execution planning (all / tests / selection)
//! - Content-addressed output cache and sidecar log
//! - Capability-gated cell execution with retries and timeouts
//! - Run orchestration

pub mod error;
pub mod execute;
pub mod graph;
pub mod interp;
pub mod notebook;
pub mod paths;
pub mod plan;
pub mod run;
pub mod state;

pub use error::{Error, Result};
pub use execute::{Capabilities, CellExecutor, ExecutionCallback, ExecutionOutcome};
pub use graph::DependencyGraph;
pub use interp::{ExecError, Interpreter, Namespace, ScriptInterpreter, Session};
pub use notebook::{Cell, CellType, Notebook, NotebookConfig, read_file};
pub use paths::NotebookDirs;
pub use plan::{Plan, RunMode, plan, validate};
pub use run::{RunOptions, RunResult, Runner, run_notebook};
pub use state::{CacheKey, CacheStore, LogRecord, Output};

//! Execution engine for woof cells.
//!
//! # Modes
//!
//! - **Shared** - in-process, against the run's mutable namespace. File and
//!   network access go through a [`Capabilities`] token granted per attempt;
//!   timeouts are enforced by a [`Watchdog`] cancelling a [`CancelToken`].
//! - **Isolated** - `bash` cells and `sidefx=isolated` cells. The body is
//!   piped to an external process (`sh` or `woof-worker`) which is killed if
//!   it overruns its timeout. The shared namespace is never exposed.
//!
//! ```text
//! CellExecutor::execute(cell, &mut namespace)
//!     │
//!     ├── data      → parse JSON / YAML / text → bind into namespace
//!     ├── bash      → shell_granted? → ProcessRunner::shell()
//!     ├── isolated  → ProcessRunner::worker(--allow-files, --allow-network)
//!     └── shared    → Session { namespace, Capabilities, CancelToken }
//!                         └── Interpreter::run(body)
//! ```
//!
//! # Module Structure
//!
//! - `context` - Cancellation, watchdog and progress callbacks
//! - `executor` - CellExecutor and the retry loop
//! - `policy` - Capability tokens
//! - `process` - External process runner

mod context;
mod executor;
mod policy;
mod process;

pub use context::{CancelToken, ExecutionCallback, Watchdog};
pub use executor::{CellExecutor, ExecutionOutcome, bind_data, parse_data};
pub use policy::{Capabilities, FileAccess, NetAccess, shell_granted};
pub use process::{ProcessOutput, ProcessRunner, WORKER_ENV, find_worker};

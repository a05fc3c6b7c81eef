//! Error types for woof-core.

use thiserror::Error;

/// Result type for woof-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a whole run.
///
/// Per-cell failures never surface here: they are recorded as `error`
/// output records (see [`crate::interp::ExecError`]) and the run continues.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read the notebook document.
    #[error("parse error: {0}")]
    Parse(String),

    /// Cyclic dependency detected in the cell graph.
    #[error("cyclic dependency detected{}", .cell.as_ref().map(|c| format!(" at cell '{}'", c)).unwrap_or_default())]
    Cycle { cell: Option<String> },

    /// A cell declares a dependency on an id that does not exist.
    #[error("cell '{cell}' depends on missing id '{dependency}'")]
    MissingDependency { cell: String, dependency: String },

    /// Two cells share the same id.
    #[error("duplicate cell id: {0}")]
    DuplicateId(String),

    /// A cell has no id.
    #[error("cell at position {0} is missing an id")]
    EmptyId(usize),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The external interpreter could not be located or started.
    #[error("interpreter error: {0}")]
    Interpreter(String),
}

impl Error {
    /// Whether this error comes from dependency validation.
    pub fn is_planning(&self) -> bool {
        matches!(
            self,
            Error::Cycle { .. }
                | Error::MissingDependency { .. }
                | Error::DuplicateId(_)
                | Error::EmptyId(_)
        )
    }

    /// Error message with a short recovery hint for terminal output.
    pub fn with_hint(&self) -> String {
        match self {
            Error::Cycle { .. } => format!(
                "{}\n  hint: remove one of the `deps=` edges that close the loop",
                self
            ),
            Error::MissingDependency { dependency, .. } => format!(
                "{}\n  hint: add a cell with id={} or drop it from `deps=`",
                self, dependency
            ),
            Error::DuplicateId(_) => format!("{}\n  hint: cell ids must be unique", self),
            Error::Interpreter(_) => format!(
                "{}\n  hint: set WOOF_WORKER_PATH or put woof-worker on PATH",
                self
            ),
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

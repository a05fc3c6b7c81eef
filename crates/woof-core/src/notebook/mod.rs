//! Notebook document model.
//!
//! This module provides:
//! - Cells with typed access to their header tokens
//! - Document-level configuration (execution order, cache, I/O policy)
//! - A reader for the `.woofnb` text format

mod cell;
mod config;
mod reader;

use std::path::PathBuf;

pub use cell::{Cell, CellType, Header, SideEffect};
pub use config::{CacheMode, ExecutionConfig, ExecutionOrder, IoPolicy, NotebookConfig};
pub use reader::{parse_str, read_file};

/// An ordered collection of cells plus run configuration.
///
/// File order is meaningful: it is the default execution order and the
/// tie-break for every derived ordering.
#[derive(Debug, Clone, Default)]
pub struct Notebook {
    /// Magic version, e.g. `WOOFNB 1.0`.
    pub version: String,
    pub config: NotebookConfig,
    pub cells: Vec<Cell>,
    /// Where the notebook was read from; drives cache and log placement.
    pub path: Option<PathBuf>,
}

impl Notebook {
    pub fn new(config: NotebookConfig, cells: Vec<Cell>) -> Self {
        Self {
            version: "WOOFNB 1.0".to_string(),
            config,
            cells,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// First cell with the given id.
    pub fn cell(&self, id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == id)
    }
}

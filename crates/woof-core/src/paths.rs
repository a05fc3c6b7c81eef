//! Notebook storage locations.
//!
//! Provides a consistent layout for everything a run writes next to the
//! notebook, so the CLI and the library agree on where to look.

use std::path::{Path, PathBuf};

/// Name used when a notebook was built in memory rather than read from disk.
pub const DEFAULT_NOTEBOOK: &str = "notebook.woofnb";

/// Storage layout for one notebook.
///
/// ```text
/// analysis.woofnb
/// analysis.woofnb.out      # sidecar log, one JSON record per line
/// .woof-cache/
/// └── analysis/            # one cache store per notebook
///     ├── data1.json
///     └── mean.json
/// ```
#[derive(Debug, Clone)]
pub struct NotebookDirs {
    /// Cache store for this notebook.
    pub cache_dir: PathBuf,

    /// Default sidecar log destination.
    pub log_path: PathBuf,
}

impl NotebookDirs {
    /// Derive the layout from a notebook path.
    ///
    /// Nothing is created here; the cache store creates its directory on
    /// first write, so a run with caching disabled leaves no trace of it.
    pub fn from_notebook_path(notebook_path: &Path) -> Self {
        let parent = notebook_path.parent().unwrap_or(Path::new("."));
        let stem = notebook_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "notebook".to_string());

        let mut log = notebook_path.as_os_str().to_owned();
        log.push(".out");

        Self {
            cache_dir: parent.join(".woof-cache").join(stem),
            log_path: PathBuf::from(log),
        }
    }

    /// Layout for an optional path, falling back to [`DEFAULT_NOTEBOOK`].
    pub fn for_notebook(path: Option<&Path>) -> Self {
        Self::from_notebook_path(path.unwrap_or(Path::new(DEFAULT_NOTEBOOK)))
    }

    /// Cache entry file for a cell.
    pub fn cache_entry(&self, cell_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", file_safe_id(cell_id)))
    }
}

/// Cell ids go into file names verbatim when they are plain identifiers;
/// anything else is hex-encoded behind a `_` prefix so it cannot escape the
/// store or collide with a plain id.
fn file_safe_id(id: &str) -> String {
    let plain = !id.is_empty()
        && !id.starts_with('_')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if plain {
        id.to_string()
    } else {
        format!("_{}", hex::encode(id.as_bytes()))
    }
}

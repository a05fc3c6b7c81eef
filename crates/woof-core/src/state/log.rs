//! Sidecar result log.
//!
//! One JSON record per line, no envelope, truncated at the start of each run.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::output::Output;

/// One line of the sidecar log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub cell: String,
    pub timestamp: String,
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub cached: bool,
}

impl LogRecord {
    pub fn new(cell: impl Into<String>, started: DateTime<Utc>, outputs: Vec<Output>) -> Self {
        Self {
            cell: cell.into(),
            timestamp: started.to_rfc3339_opts(SecondsFormat::Micros, true),
            outputs,
            cached: false,
        }
    }

    pub fn cached(mut self) -> Self {
        self.cached = true;
        self
    }
}

/// Append-only writer for one run's log.
pub struct SidecarLog {
    path: PathBuf,
}

impl SidecarLog {
    /// Open the log at `path`, truncating it.
    pub fn reset(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::File::create(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Read back every record of a log.
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<LogRecord>> {
    let file = fs::File::open(path.as_ref())?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

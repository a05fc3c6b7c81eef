//! Cell output records.
//!
//! Records are serialized with an `output_type` tag so that cache entries and
//! sidecar log lines are self-describing:
//!
//! ```json
//! {"output_type": "stream", "name": "stdout", "text": "hello\n"}
//! {"output_type": "execute_result", "repr": "[1, 2, 3]"}
//! {"output_type": "error", "ename": "PolicyError", "evalue": "...", "traceback": []}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which captured stream a [`Output::Stream`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamName::Stdout => f.write_str("stdout"),
            StreamName::Stderr => f.write_str("stderr"),
        }
    }
}

/// One output record. A cell's result is an ordered sequence of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        name: StreamName,
        text: String,
    },
    ExecuteResult {
        repr: String,
    },
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

impl Output {
    pub fn stdout(text: impl Into<String>) -> Self {
        Output::Stream {
            name: StreamName::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Output::Stream {
            name: StreamName::Stderr,
            text: text.into(),
        }
    }

    pub fn error(ename: impl Into<String>, evalue: impl Into<String>) -> Self {
        Output::Error {
            ename: ename.into(),
            evalue: evalue.into(),
            traceback: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Output::Error { .. })
    }
}

/// Whether a sequence of records counts as a failed cell.
pub fn has_error(outputs: &[Output]) -> bool {
    outputs.iter().any(Output::is_error)
}

/// Records for captured text, skipping empty streams.
pub fn stream_records(stdout: &str, stderr: &str) -> Vec<Output> {
    let mut records = Vec::with_capacity(2);
    if !stdout.is_empty() {
        records.push(Output::stdout(stdout));
    }
    if !stderr.is_empty() {
        records.push(Output::stderr(stderr));
    }
    records
}

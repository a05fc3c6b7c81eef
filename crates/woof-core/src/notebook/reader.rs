//! Reader for `.woofnb` documents.
//!
//! ````text
//! %WOOFNB 1.0            <- magic line
//! name: demo             <- YAML header, up to the first cell fence
//! execution:
//!   cache: content-hash
//!
//! ```cell id=data1 type=data
//! [1, 2, 3]
//! ```
//! ````
//!
//! Only what the engine needs is read here; formatting and round-trip
//! printing belong to the format layer.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

use super::Notebook;
use super::cell::{Cell, CellType, Header};
use super::config::NotebookConfig;

const MAGIC_PREFIX: &str = "%WOOFNB ";
const CELL_FENCE: &str = "```cell";
const CLOSE_FENCE: &str = "```";

/// Parse a notebook file, remembering its path for cache and log placement.
pub fn read_file(path: impl AsRef<Path>) -> Result<Notebook> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Parse(format!("failed to read {}: {}", path.display(), e)))?;
    let mut notebook = parse_str(&text)?;
    notebook.path = Some(path.to_path_buf());
    Ok(notebook)
}

/// Parse notebook text.
pub fn parse_str(text: &str) -> Result<Notebook> {
    let lines: Vec<&str> = text.lines().collect();

    let magic_idx = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .ok_or_else(|| Error::Parse("empty document: missing %WOOFNB magic line".to_string()))?;
    let magic = lines[magic_idx];
    if !magic.starts_with(MAGIC_PREFIX) {
        return Err(Error::Parse(
            "missing or invalid magic line '%WOOFNB x.y'".to_string(),
        ));
    }
    let version = magic.trim()[1..].to_string();

    let mut idx = magic_idx + 1;
    let header_start = idx;
    while idx < lines.len() && !lines[idx].trim_start().starts_with(CELL_FENCE) {
        idx += 1;
    }
    let header_text = lines[header_start..idx].join("\n");
    let config = NotebookConfig::from_yaml(&header_text)
        .map_err(|e| Error::Parse(format!("invalid notebook header: {}", e)))?;

    let mut cells = Vec::new();
    while idx < lines.len() {
        let line = lines[idx].trim_start();
        idx += 1;
        let Some(tokens) = line.strip_prefix(CELL_FENCE) else {
            continue;
        };

        let header = parse_header_tokens(tokens.trim());
        let id = header.get("id").unwrap_or_default().to_string();
        let kind = CellType::parse(header.get("type").unwrap_or("raw"));

        let body_start = idx;
        while idx < lines.len() && lines[idx].trim() != CLOSE_FENCE {
            idx += 1;
        }
        let body = lines[body_start..idx].join("\n").trim_end_matches('\n').to_string();
        // Skip the closing fence.
        idx += 1;

        cells.push(Cell {
            id,
            kind,
            body,
            header,
        });
    }

    tracing::debug!("Parsed {} cells ({})", cells.len(), version);

    Ok(Notebook {
        version,
        config,
        cells,
        path: None,
    })
}

/// Parse `key=value` tokens; values may be double-quoted with `\"` escapes.
///
/// A key without `=` is kept with an empty value and ends the scan.
fn parse_header_tokens(s: &str) -> Header {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    let mut header = Header::new();
    let mut i = 0;

    loop {
        while i < n && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= n {
            break;
        }

        let key_start = i;
        while i < n && chars[i] != '=' && !chars[i].is_whitespace() {
            i += 1;
        }
        let key: String = chars[key_start..i].iter().collect();
        if i >= n || chars[i] != '=' {
            header.insert(key, "");
            break;
        }
        i += 1;
        while i < n && chars[i].is_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if i < n && chars[i] == '"' {
            i += 1;
            while i < n {
                match chars[i] {
                    '\\' if i + 1 < n && chars[i + 1] == '"' => {
                        value.push('"');
                        i += 2;
                    }
                    '"' => {
                        i += 1;
                        break;
                    }
                    c => {
                        value.push(c);
                        i += 1;
                    }
                }
            }
        } else {
            while i < n && !chars[i].is_whitespace() {
                value.push(chars[i]);
                i += 1;
            }
        }
        header.insert(key, value);
    }

    header
}

//! Content-addressed output cache.
//!
//! A cell's key is a SHA-256 over a canonical JSON payload of everything that
//! determines its output: its body, the bodies of its transitive
//! dependencies, the notebook `env` and `parameters`, and the engine version.
//! Entries live one file per cell under the notebook's cache directory and
//! carry the key they were written under; a lookup only hits when the stored
//! key matches exactly.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::paths::NotebookDirs;

use super::output::Output;

/// Version string mixed into every key; a new engine never reuses old entries.
pub const ENGINE_VERSION: &str = concat!("woof-", env!("CARGO_PKG_VERSION"));

/// Hex-encoded SHA-256 cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for one cell.
    ///
    /// `transitive` maps each transitive dependency id (not the cell itself)
    /// to its body. The serialized payload has sorted keys at every level, so
    /// equal inputs hash equally regardless of how they were assembled.
    pub fn derive(
        body: &str,
        transitive: &BTreeMap<String, String>,
        env: &Value,
        params: &Value,
    ) -> Self {
        Self::derive_with_version(body, transitive, env, params, ENGINE_VERSION)
    }

    pub fn derive_with_version(
        body: &str,
        transitive: &BTreeMap<String, String>,
        env: &Value,
        params: &Value,
        engine_version: &str,
    ) -> Self {
        let payload = canonical(json!({
            "body": body,
            "deps": transitive,
            "env": env,
            "params": params,
            "runner": engine_version,
        }));
        let mut hasher = Sha256::new();
        hasher.update(payload.to_string().as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rebuild objects with sorted keys, recursively.
fn canonical(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, canonical(v))).collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonical).collect()),
        other => other,
    }
}

/// Stored form of one cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: CacheKey,
    outputs: Vec<Output>,
}

/// One notebook's cache store.
pub struct CacheStore {
    dirs: NotebookDirs,
}

impl CacheStore {
    pub fn new(dirs: NotebookDirs) -> Self {
        Self { dirs }
    }

    /// Store for the notebook at `path`.
    pub fn for_notebook(path: Option<&Path>) -> Self {
        Self::new(NotebookDirs::for_notebook(path))
    }

    pub fn dir(&self) -> &Path {
        &self.dirs.cache_dir
    }

    pub fn entry_path(&self, cell_id: &str) -> PathBuf {
        self.dirs.cache_entry(cell_id)
    }

    /// Stored outputs for `cell_id`, only when stored under exactly `key`.
    ///
    /// Missing entries, key mismatches and unreadable or malformed files are
    /// all plain misses.
    pub fn read(&self, cell_id: &str, key: &CacheKey) -> Option<Vec<Output>> {
        let path = self.entry_path(cell_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Ignoring unreadable cache entry {:?}: {}", path, e);
                }
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Ignoring malformed cache entry {:?}: {}", path, e);
                return None;
            }
        };

        if entry.key != *key {
            tracing::debug!("Cache key changed for cell '{}'", cell_id);
            return None;
        }
        Some(entry.outputs)
    }

    /// Persist `outputs` for `cell_id`, replacing any previous entry.
    ///
    /// The entry is written to a uniquely named file in the same directory
    /// and renamed into place, so a reader never sees a half-written entry
    /// under the final name.
    pub fn write(&self, cell_id: &str, key: &CacheKey, outputs: &[Output]) -> Result<()> {
        fs::create_dir_all(self.dir())?;

        let path = self.entry_path(cell_id);
        let entry = CacheEntry {
            key: key.clone(),
            outputs: outputs.to_vec(),
        };
        let bytes = serde_json::to_vec(&entry)?;

        let temp_path = self.dir().join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        tracing::debug!("Cached {} outputs for cell '{}'", outputs.len(), cell_id);
        Ok(())
    }
}

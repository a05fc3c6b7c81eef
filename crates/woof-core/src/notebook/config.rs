//! Document-level configuration read from the notebook's YAML header.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// How the planner orders cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOrder {
    /// File order.
    #[default]
    Linear,
    /// Dependency order, tie-broken by file position.
    Graph,
}

/// Whether the content-addressed cache is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "RawCacheSetting")]
pub enum CacheMode {
    #[default]
    Disabled,
    ContentHash,
}

impl CacheMode {
    pub fn is_enabled(self) -> bool {
        self == CacheMode::ContentHash
    }
}

/// The header accepts `cache: true`, `cache: 1` or `cache: content-hash`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCacheSetting {
    Flag(bool),
    Number(i64),
    Text(String),
}

impl From<RawCacheSetting> for CacheMode {
    fn from(raw: RawCacheSetting) -> Self {
        let enabled = match raw {
            RawCacheSetting::Flag(flag) => flag,
            RawCacheSetting::Number(n) => n == 1,
            RawCacheSetting::Text(text) => {
                matches!(text.trim(), "1" | "true" | "yes" | "content-hash")
            }
        };
        if enabled {
            CacheMode::ContentHash
        } else {
            CacheMode::Disabled
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub order: ExecutionOrder,
    pub cache: CacheMode,
}

/// Document-wide capability switches. Everything is denied by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IoPolicy {
    pub allow_files: bool,
    pub allow_network: bool,
    pub allow_shell: bool,
}

/// Parsed notebook header.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotebookConfig {
    pub name: Option<String>,
    pub language: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub execution: ExecutionConfig,
    #[serde(deserialize_with = "null_as_default")]
    pub io_policy: IoPolicy,
    pub env: Value,
    pub parameters: Value,
}

/// `io_policy:` with no entries is YAML null; treat it like an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl NotebookConfig {
    /// Parse the YAML header body (without the magic line).
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let blank = text
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#'));
        if blank {
            return Ok(Self::default());
        }
        let value: Option<NotebookConfig> = serde_yaml::from_str(text)?;
        Ok(value.unwrap_or_default())
    }

    pub fn cache_enabled(&self) -> bool {
        self.execution.cache.is_enabled()
    }
}

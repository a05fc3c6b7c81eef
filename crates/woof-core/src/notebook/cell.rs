//! Cell data model and typed header accessors.

use std::fmt;
use std::time::Duration;

/// Kind of a cell, taken from its `type=` header token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Program text evaluated in the shared namespace.
    Code,
    /// Like `Code`, selected by `woof test`.
    Test,
    /// Shell script, always run in an external process.
    Bash,
    /// Structured data bound into the namespace.
    Data,
    /// Markdown prose (never executed).
    Markdown,
    /// Raw text (never executed).
    Raw,
    /// Visualization spec (never executed).
    Viz,
    /// Any other tag, executed like `Code`.
    Other(String),
}

impl CellType {
    /// Parse a `type=` token value.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "code" => CellType::Code,
            "test" => CellType::Test,
            "bash" => CellType::Bash,
            "data" => CellType::Data,
            "md" => CellType::Markdown,
            "raw" => CellType::Raw,
            "viz" => CellType::Viz,
            other => CellType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CellType::Code => "code",
            CellType::Test => "test",
            CellType::Bash => "bash",
            CellType::Data => "data",
            CellType::Markdown => "md",
            CellType::Raw => "raw",
            CellType::Viz => "viz",
            CellType::Other(tag) => tag,
        }
    }

    /// Presentation-only cells are never executed.
    pub fn is_presentation(&self) -> bool {
        matches!(self, CellType::Markdown | CellType::Raw | CellType::Viz)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side-effect capability class a cell requests via `sidefx=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideEffect {
    #[default]
    None,
    /// File-system access.
    Fs,
    /// Network access.
    Net,
    /// Shell access; implies both `Fs` and `Net`.
    Shell,
    /// Run in an external process without the shared namespace.
    Isolated,
}

impl SideEffect {
    /// Parse a `sidefx=` token value. Unknown values request nothing.
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "fs" => SideEffect::Fs,
            "net" => SideEffect::Net,
            "shell" => SideEffect::Shell,
            "isolated" => SideEffect::Isolated,
            _ => SideEffect::None,
        }
    }

    pub fn wants_files(self) -> bool {
        matches!(self, SideEffect::Fs | SideEffect::Shell)
    }

    pub fn wants_network(self) -> bool {
        matches!(self, SideEffect::Net | SideEffect::Shell)
    }

    pub fn wants_shell(self) -> bool {
        matches!(self, SideEffect::Shell)
    }
}

/// Ordered `key=value` tokens from a cell fence line.
///
/// Order is kept for round-tripping by the format layer; the engine only
/// reads the recognized keys through the typed accessors below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    tokens: Vec<(String, String)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a token, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.tokens.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.tokens.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Declared dependency ids, in declaration order.
    pub fn deps(&self) -> Vec<String> {
        split_list(self.get("deps"))
    }

    /// Positive timeout. Zero or unparsable values mean unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        self.get("timeout")
            .and_then(|t| t.trim().parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    pub fn retries(&self) -> u32 {
        self.get("retries")
            .and_then(|r| r.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn sidefx(&self) -> SideEffect {
        self.get("sidefx").map(SideEffect::parse).unwrap_or_default()
    }

    pub fn disabled(&self) -> bool {
        self.get("disabled").is_some_and(is_truthy)
    }

    pub fn tags(&self) -> Vec<String> {
        split_list(self.get("tags"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Header {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut header = Header::new();
        for (k, v) in iter {
            header.insert(k, v);
        }
        header
    }
}

/// A single unit of work in a notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub id: String,
    pub kind: CellType,
    pub body: String,
    pub header: Header,
}

impl Cell {
    /// Build a cell; `id` and `type` are mirrored into the header.
    pub fn new(id: impl Into<String>, kind: CellType, body: impl Into<String>) -> Self {
        let id = id.into();
        let mut header = Header::new();
        header.insert("id", id.clone());
        header.insert("type", kind.as_str());
        Self {
            id,
            kind,
            body: body.into(),
            header,
        }
    }

    /// Builder-style header token.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.header.insert(key, value);
        self
    }

    pub fn deps(&self) -> Vec<String> {
        self.header.deps()
    }

    /// Whether the orchestrator should skip this cell without a log entry.
    pub fn is_skipped(&self) -> bool {
        self.header.disabled() || self.kind.is_presentation()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

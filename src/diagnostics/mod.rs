mod batch;
mod engine;
mod watcher;

pub use batch::{parse_build_output, BatchParse, ErrorLocation};
pub use engine::{BatchStatus, DiagnosticsEngine};
pub use watcher::{check_ghcid_installed, BuildWatcher, WatchStatus};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Map a header keyword (`error`, `warning`, `[error]`, ...) to a
    /// severity; anything mentioning "error" counts as one.
    pub fn from_keyword(word: &str) -> Self {
        let word = word.to_lowercase();
        if word.contains("error") {
            Severity::Error
        } else if word.contains("warning") {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}

/// One structured build diagnostic mapped onto a source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub path: PathBuf,
    /// 0-based line.
    pub line: usize,
    /// 0-based column range, end exclusive.
    pub col_start: usize,
    pub col_end: usize,
    pub severity: Severity,
    pub message: String,
}

/// Where the parsers look up open-document text to widen column ranges.
/// The host editor owns the real documents; the adapter feeds a store with
/// whatever it has read itself.
pub trait DocumentLookup {
    fn line_text(&self, path: &Path, line: usize) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<PathBuf, String>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.docs.insert(path.into(), text.into());
    }
}

impl DocumentLookup for DocumentStore {
    fn line_text(&self, path: &Path, line: usize) -> Option<String> {
        self.docs
            .get(path)
            .and_then(|text| text.lines().nth(line).map(str::to_string))
    }
}

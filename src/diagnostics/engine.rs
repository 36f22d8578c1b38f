use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;

use super::{Diagnostic, DocumentLookup, DocumentStore, Severity};

/// `<file>:<line>:<col>[-<col2>]: <severity>[:] <message>`
static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?):(\d+):(\d+)(?:-(\d+))?:\s*(error|warning|\[error\]|\[warning\]):?\s*(.*)$")
        .unwrap()
});

/// Source-context gutter lines (`  10 | ...`, `     | ^^^`) carried inside
/// messages.
static GUTTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d*\s*\|").unwrap());

const ALL_CLEAR: &str = "All good";

/// What one processed batch did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// The all-clear marker was seen; everything was cleared.
    AllGood,
    /// At least one diagnostic was parsed and the collection was replaced.
    Diagnostics,
    /// Nothing recognizable in the batch; the collection was left alone.
    Quiet,
}

#[derive(Debug)]
struct PendingDiagnostic {
    file: String,
    line: usize,
    col: usize,
    severity: Severity,
    message: Vec<String>,
}

/// Incremental parser for the build watcher's stdout stream.
///
/// Chunks arrive in arbitrary sizes; complete lines are classified as
/// headers, continuations, or noise, and each finished batch replaces the
/// whole diagnostics collection. Not safe for concurrent streams — one
/// watcher process feeds one engine.
pub struct DiagnosticsEngine {
    workspace_root: PathBuf,
    documents: DocumentStore,
    line_buffer: String,
    current: Option<PendingDiagnostic>,
    diagnostics: HashMap<PathBuf, Vec<Diagnostic>>,
}

impl DiagnosticsEngine {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            documents: DocumentStore::new(),
            line_buffer: String::new(),
            current: None,
            diagnostics: HashMap::new(),
        }
    }

    pub fn documents_mut(&mut self) -> &mut DocumentStore {
        &mut self.documents
    }

    pub fn diagnostics(&self) -> &HashMap<PathBuf, Vec<Diagnostic>> {
        &self.diagnostics
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.diagnostics.clear();
    }

    /// Feed one stdout chunk. The trailing fragment after the last newline
    /// is buffered for the next chunk rather than parsed as a line.
    pub fn process_chunk(&mut self, chunk: &str) -> BatchStatus {
        self.line_buffer.push_str(chunk);

        let buffered = std::mem::take(&mut self.line_buffer);
        let mut lines: Vec<String> = buffered.split('\n').map(str::to_string).collect();
        self.line_buffer = lines.pop().unwrap_or_default();

        self.process_lines(lines)
    }

    fn process_lines(&mut self, lines: Vec<String>) -> BatchStatus {
        let mut batch: HashMap<PathBuf, Vec<Diagnostic>> = HashMap::new();
        let mut saw_any = false;

        for line in lines {
            if line.contains(ALL_CLEAR) {
                self.current = None;
                self.diagnostics.clear();
                return BatchStatus::AllGood;
            }
            if line.contains("Loading...") || line.contains("Ok, modules loaded:") {
                continue;
            }

            if let Some(caps) = HEADER.captures(&line) {
                self.flush_current(&mut batch);
                saw_any = true;
                self.current = Some(PendingDiagnostic {
                    file: caps[1].to_string(),
                    line: caps[2].parse().unwrap_or(1),
                    col: caps[3].parse().unwrap_or(1),
                    severity: Severity::from_keyword(&caps[5]),
                    message: vec![caps[6].trim().to_string()],
                });
            } else if line.trim().is_empty() {
                self.flush_current(&mut batch);
            } else if let Some(pending) = self.current.as_mut() {
                pending.message.push(line.trim().to_string());
            }
        }

        self.flush_current(&mut batch);

        if saw_any {
            self.diagnostics = batch;
            BatchStatus::Diagnostics
        } else {
            BatchStatus::Quiet
        }
    }

    fn flush_current(&mut self, batch: &mut HashMap<PathBuf, Vec<Diagnostic>>) {
        let pending = match self.current.take() {
            Some(pending) => pending,
            None => return,
        };

        let path = self.workspace_root.join(&pending.file);
        let line = pending.line.saturating_sub(1);
        let col = pending.col.saturating_sub(1);

        let mut message = pending
            .message
            .iter()
            .filter(|l| !GUTTER.is_match(l))
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        let (col_start, col_end) = match self.documents.line_text(&path, line) {
            Some(text) => {
                if text.trim_start().starts_with("import") {
                    message = format!("Import error: {}", message);
                    (text.find("import").unwrap_or(0), text.chars().count())
                } else {
                    // Widen to the next whitespace so the squiggle covers
                    // the whole offending token.
                    let chars: Vec<char> = text.chars().collect();
                    let mut end = col + 1;
                    while end < chars.len() && !chars[end].is_whitespace() {
                        end += 1;
                    }
                    (col, end)
                }
            }
            None => (col, col + 1),
        };

        batch.entry(path.clone()).or_default().push(Diagnostic {
            path,
            line,
            col_start,
            col_end,
            severity: pending.severity,
            message,
        });
    }
}

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{Diagnostic, DocumentLookup, Severity};

static BATCH_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<file>.+?):(?P<line>\d+):(?P<col>\d+):\s+(?P<sev>error|warning|info):\s*(?P<message>.*)$")
        .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLocation {
    pub path: PathBuf,
    pub line: usize,
    pub col_start: usize,
    pub col_end: usize,
}

/// Result of parsing one complete build-output blob.
#[derive(Debug, Default)]
pub struct BatchParse {
    pub diagnostics: HashMap<PathBuf, Vec<Diagnostic>>,
    /// Location of the first error-severity diagnostic, for the caller to
    /// reveal in the editor.
    pub first_error: Option<ErrorLocation>,
}

/// Parse a complete (non-streaming) build-output blob.
///
/// Messages run from the header to the next line that starts in column
/// zero. Diagnostics for files the lookup does not know are dropped — the
/// range heuristic needs the line text.
pub fn parse_build_output(
    output: &str,
    workspace_root: &Path,
    docs: &dyn DocumentLookup,
) -> BatchParse {
    let mut parse = BatchParse::default();

    let lines: Vec<&str> = output.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let caps = match BATCH_HEADER.captures(lines[i]) {
            Some(caps) => caps,
            None => {
                i += 1;
                continue;
            }
        };

        // Accumulate the message body up to the next non-indented line.
        let mut message_lines = vec![caps["message"].trim_end().to_string()];
        let mut j = i + 1;
        while j < lines.len() {
            let next = lines[j];
            if !next.is_empty() && !next.starts_with(|c: char| c.is_whitespace()) {
                break;
            }
            message_lines.push(next.to_string());
            j += 1;
        }
        i = j;

        let message = message_lines.join("\n").trim().to_string();
        let severity = Severity::from_keyword(&caps["sev"]);
        let path = workspace_root.join(&caps["file"]);
        let line = caps["line"].parse::<usize>().unwrap_or(1).saturating_sub(1);
        let col = caps["col"].parse::<usize>().unwrap_or(1).saturating_sub(1);

        let text = match docs.line_text(&path, line) {
            Some(text) => text,
            None => continue,
        };

        let rest: Vec<char> = text.chars().skip(col).collect();
        let error_length = if rest.iter().collect::<String>().starts_with("import") {
            rest.len()
        } else {
            rest.iter()
                .position(|c| *c == ' ')
                .unwrap_or(rest.len())
        };

        let diagnostic = Diagnostic {
            path: path.clone(),
            line,
            col_start: col,
            col_end: col + error_length,
            severity,
            message,
        };

        if parse.first_error.is_none() && severity == Severity::Error {
            parse.first_error = Some(ErrorLocation {
                path: path.clone(),
                line,
                col_start: diagnostic.col_start,
                col_end: diagnostic.col_end,
            });
        }

        parse.diagnostics.entry(path).or_default().push(diagnostic);
    }

    parse
}

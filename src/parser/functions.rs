use once_cell::sync::Lazy;
use regex::Regex;

/// One top-level definition parsed out of a source buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub args: Vec<String>,
    /// One entry per source line belonging to the definition, trimmed.
    pub body: Vec<String>,
}

/// `name args = first-body-fragment`, with the argument region running up to
/// the first `=` on the line.
static DEFINITION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_']*)\s+([^=]*)=\s*(.*)$").unwrap());

/// Line prefixes that can never open a value definition.
const SKIP_PREFIXES: &[&str] = &[
    "data", "type", "newtype", "instance", "class", "module", "import", "{-#", "--",
];

/// Parse every top-level definition out of `source`, in file order.
///
/// Recomputed from the full text on every call; nothing is cached, so the
/// result always reflects the buffer as given.
pub fn extract_functions(source: &str) -> Vec<FunctionDef> {
    let mut functions = Vec::new();
    let mut current: Option<FunctionDef> = None;

    for line in source.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || SKIP_PREFIXES.iter().any(|kw| trimmed.starts_with(kw)) {
            continue;
        }

        if let Some(caps) = DEFINITION_HEADER.captures(trimmed) {
            if let Some(done) = current.take() {
                functions.push(done);
            }

            let raw_args = caps[2].trim();
            current = Some(FunctionDef {
                name: caps[1].to_string(),
                args: if raw_args.is_empty() {
                    Vec::new()
                } else {
                    extract_arguments(raw_args)
                },
                body: vec![caps[3].trim().to_string()],
            });
        } else if current.is_some() && line.starts_with(|c: char| c.is_whitespace()) {
            // Indented continuation; where/let blocks are swallowed here too.
            if let Some(func) = current.as_mut() {
                func.body.push(trimmed.to_string());
            }
        } else if let Some(done) = current.take() {
            functions.push(done);
        }
    }

    if let Some(done) = current.take() {
        functions.push(done);
    }

    functions
}

/// Split an argument region on spaces, keeping parenthesized groups (e.g. a
/// constructor pattern with fields) together as one token.
pub fn extract_arguments(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut buf = String::new();
    let mut depth = 0i32;

    for ch in raw.chars() {
        match ch {
            '(' => {
                depth += 1;
                buf.push(ch);
            }
            ')' => {
                depth -= 1;
                buf.push(ch);
            }
            ' ' if depth == 0 => {
                if !buf.is_empty() {
                    args.push(std::mem::take(&mut buf));
                }
            }
            _ => buf.push(ch),
        }
    }

    if !buf.is_empty() {
        args.push(buf);
    }

    args
}

use once_cell::sync::Lazy;
use regex::Regex;

/// Template Haskell splice brackets: when present, only the interior of
/// `[|| ... ||]` is worth tokenizing.
static SPLICE_REGION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\|\|(.+?)\|\|\]").unwrap());

static CALLER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\w+\s*=\s*(\w+)").unwrap());

static MODULE_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*module\s+([\w.]+)(\s*\(.*\))?\s+where").unwrap());

/// Split the right-hand side of a definition into word tokens suitable for
/// matching against known function names.
///
/// Spaces inside string literals and inside parentheses do not split, so
/// `func "a b" (g x)` comes back as three tokens. The literal tokens `.`,
/// `=` and `->` are dropped.
pub fn extract_words(rhs: &str) -> Vec<String> {
    let rhs = match SPLICE_REGION.captures(rhs) {
        Some(caps) => caps[1].trim().to_string(),
        None => rhs.to_string(),
    };

    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut depth = 0i32;

    for ch in rhs.chars() {
        if ch == '"' {
            in_string = !in_string;
        }
        if ch == '(' && !in_string {
            depth += 1;
        }
        if ch == ')' && !in_string {
            depth -= 1;
        }

        if ch == ' ' && !in_string && depth == 0 {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        words.push(current);
    }

    words.retain(|w| !matches!(w.as_str(), "." | "=" | "->"));
    words
}

/// 1-based line of the first definition of `name` (`^\s*name\b.*=`), or 0
/// when the file has none. Idempotent over unchanged text.
pub fn find_function_definition_line(source: &str, name: &str) -> usize {
    let pattern = format!(r"^\s*{}\b.*=", regex::escape(name));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return 0,
    };

    for (i, line) in source.lines().enumerate() {
        if re.is_match(line) {
            return i + 1;
        }
    }

    0
}

/// First word of the right-hand side of a definition line, used to label the
/// caller frame when stepping in.
pub fn caller_name(line: &str) -> String {
    CALLER_NAME
        .captures(line)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Module name from the first `module ... where` declaration, if any.
pub fn module_name(source: &str) -> Option<String> {
    source
        .lines()
        .find_map(|line| MODULE_DECL.captures(line).map(|caps| caps[1].to_string()))
}

//! Best-effort content cleanup before writing.
//!
//! Model-produced file content sometimes arrives with escape sequences left
//! as literal text (a symptom of doubly-escaped JSON) and with flattened
//! indentation. This module repairs the escapes and re-indents line by line
//! for common source-file families.
//!
//! This is a heuristic, not a parser. It tracks nesting with a simple
//! per-line counter, so multi-line strings or braces inside literals can
//! confuse it. It is stable on input that is already well formatted; it is
//! not guaranteed idempotent on arbitrary text.

use std::path::Path;

const INDENT: &str = "    ";

/// Leading keywords that dedent relative to the suite they close.
const PY_DEDENT_KEYWORDS: [&str; 4] = ["except", "elif", "else", "finally"];

/// Clean up `content` for writing to `target`. Extension decides the pass;
/// unknown extensions get escape repair only.
pub fn normalize(content: &str, target: &Path) -> String {
    let repaired = repair_escapes(content);

    let ext = target
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "js" | "jsx" | "ts" | "tsx" | "css" | "json" | "rs" | "java" | "c" | "h" | "cpp"
        | "go" => reindent_braces(&repaired),
        "py" => reindent_colons(&repaired),
        _ => repaired,
    }
}

/// Replace escape sequences that survived JSON decoding as literal text.
fn repair_escapes(content: &str) -> String {
    let mut repaired = content.to_string();
    if repaired.contains("\\n") {
        repaired = repaired.replace("\\n", "\n");
    }
    if repaired.contains("\\t") {
        repaired = repaired.replace("\\t", "\t");
    }
    if repaired.contains("\\\"") {
        repaired = repaired.replace("\\\"", "\"");
    }
    if repaired.contains("\\\\") {
        repaired = repaired.replace("\\\\", "\\");
    }
    repaired
}

/// Re-indent brace-delimited content: dedent on a leading closer, indent
/// after a trailing opener.
fn reindent_braces(content: &str) -> String {
    let mut out = Vec::new();
    let mut level: usize = 0;

    for line in content.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            out.push(String::new());
            continue;
        }

        if stripped.starts_with(['}', ']', ')']) {
            level = level.saturating_sub(1);
        }

        out.push(format!("{}{stripped}", INDENT.repeat(level)));

        if stripped.ends_with(['{', '[', '(']) {
            level += 1;
        }
    }

    out.join("\n")
}

/// Re-indent colon-delimited (Python) content: indent after a trailing
/// colon, with `except`/`elif`/`else`/`finally` sitting one level shallower
/// than the suite they continue.
fn reindent_colons(content: &str) -> String {
    let mut out = Vec::new();
    let mut level: usize = 0;

    for line in content.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            out.push(String::new());
            continue;
        }

        if PY_DEDENT_KEYWORDS
            .iter()
            .any(|kw| stripped.starts_with(kw))
        {
            level = level.saturating_sub(1);
        }

        out.push(format!("{}{stripped}", INDENT.repeat(level)));

        if stripped.ends_with(':') {
            level += 1;
        }
    }

    out.join("\n")
}

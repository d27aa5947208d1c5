//! Front matter reader.
//!
//! Posts may start with a small header fenced by `---` lines:
//!
//! ```text
//! ---
//! title: "Hello"
//! date: 2025-03-01
//! draft: false
//! tags:
//!   - rust
//!   - blog
//! ---
//! ```
//!
//! This is deliberately not YAML: each line is either `key: value`, `key:`
//! (opening a list), or `- item` (appending to the open list). Anything else
//! is skipped with a diagnostic.

use crate::error::{Diagnostic, Severity};
use crate::types::{MetaValue, Metadata};

const MARKER: &str = "---";

/// Result of reading front matter with diagnostics.
#[derive(Debug, Clone)]
pub struct FrontMatterResult {
    pub metadata: Metadata,
    /// Text after the header, or the untouched input when there is none.
    pub body: String,
    /// Non-fatal findings about the header.
    pub diagnostics: Vec<Diagnostic>,
}

/// Split `raw` into its metadata header and body.
///
/// Without a header, returns empty metadata and `raw` unchanged.
pub fn parse_front_matter(raw: &str) -> (Metadata, String) {
    let result = parse_front_matter_with_diagnostics(raw);
    (result.metadata, result.body)
}

/// Like [`parse_front_matter`], also reporting lines that were skipped.
pub fn parse_front_matter_with_diagnostics(raw: &str) -> FrontMatterResult {
    let mut diagnostics = Vec::new();

    let Some((header, body)) = split_header(raw, &mut diagnostics) else {
        return FrontMatterResult {
            metadata: Metadata::new(),
            body: raw.to_string(),
            diagnostics,
        };
    };

    let metadata = parse_header(header, &mut diagnostics);
    tracing::debug!(
        fields = metadata.len(),
        skipped = diagnostics.len(),
        "parsed front matter"
    );

    FrontMatterResult {
        metadata,
        body: body.to_string(),
        diagnostics,
    }
}

/// Locate the header. Returns `(header_text, body_text)`.
fn split_header<'a>(raw: &'a str, diagnostics: &mut Vec<Diagnostic>) -> Option<(&'a str, &'a str)> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = text.split_inclusive('\n');

    let first = lines.next()?;
    if first.trim_end() != MARKER {
        return None;
    }

    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if line.trim_end() == MARKER {
            let header = &text[header_start..offset];
            let body = text[offset + line.len()..].trim_start();
            return Some((header, body));
        }
        offset += line.len();
    }

    diagnostics.push(Diagnostic {
        severity: Severity::Warning,
        message: "Front matter opened with `---` but never closed; treating it as body text".into(),
        line: Some(1),
        code: Some("W103".into()),
    });
    None
}

fn parse_header(header: &str, diagnostics: &mut Vec<Diagnostic>) -> Metadata {
    let mut metadata = Metadata::new();
    let mut open_list: Option<(String, Vec<String>)> = None;

    for (idx, raw_line) in header.lines().enumerate() {
        // The header starts on the second line of the document.
        let line_no = idx + 2;
        let line = raw_line.replace('\t', "  ");
        if line.trim().is_empty() {
            continue;
        }

        if let Some(item) = list_item(&line) {
            match open_list.as_mut() {
                Some((_, items)) => items.push(item.to_string()),
                None => diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    message: format!("List item '{item}' has no `key:` line above it"),
                    line: Some(line_no),
                    code: Some("W102".into()),
                }),
            }
            continue;
        }

        if let Some((key, value)) = key_value(&line) {
            if let Some((list_key, items)) = open_list.take() {
                metadata.insert(list_key, MetaValue::List(items));
            }
            if value.is_empty() {
                open_list = Some((key.to_string(), Vec::new()));
            } else {
                metadata.insert(key, coerce_value(value));
            }
            continue;
        }

        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message: format!("Ignored front matter line: {}", line.trim()),
            line: Some(line_no),
            code: Some("W101".into()),
        });
    }

    if let Some((list_key, items)) = open_list {
        metadata.insert(list_key, MetaValue::List(items));
    }

    metadata
}

/// `- item` → `item` (trimmed).
fn list_item(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('-')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// `key: value` → `(key, value)`; the key must start at column 0.
fn key_value(line: &str) -> Option<(&str, &str)> {
    let key_end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(line.len());
    if key_end == 0 {
        return None;
    }

    let value = line[key_end..].trim_start().strip_prefix(':')?;
    Some((&line[..key_end], value.trim()))
}

/// Coerce a scalar into the most specific `MetaValue`:
/// `true`/`false` (any case) → Bool, finite number → Number, otherwise a
/// String with one layer of matching quotes removed.
fn coerce_value(raw: &str) -> MetaValue {
    if raw.eq_ignore_ascii_case("true") {
        return MetaValue::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return MetaValue::Bool(false);
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => MetaValue::Number(n),
        _ => MetaValue::String(strip_quotes(raw).to_string()),
    }
}

fn strip_quotes(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

//! WASM bindings for `postdoc`.
//!
//! Exposes the post renderer to JavaScript via wasm-bindgen. Call
//! `render_markdown()` for a body, `parse_front_matter()` to split a source
//! into metadata and body, or `sanitize_rich_html()` for exported HTML.

use postdoc::RenderOptions;
use wasm_bindgen::prelude::*;

/// Render a Markdown body (no front matter handling) as an HTML fragment.
#[wasm_bindgen]
pub fn render_markdown(body: &str) -> String {
    postdoc::render_markdown(body)
}

/// Split a source into front matter and body.
///
/// Returns a JSON object `{ metadata, body }`.
#[wasm_bindgen]
pub fn parse_front_matter(raw: &str) -> String {
    let (metadata, body) = postdoc::parse_front_matter(raw);
    serde_json::json!({
        "metadata": metadata,
        "body": body,
    })
    .to_string()
}

/// Clean HTML exported from a word processor.
#[wasm_bindgen]
pub fn sanitize_rich_html(raw: &str) -> String {
    postdoc::sanitize_rich_html(raw)
}

/// Parse a Markdown source and return `{ metadata, blocks }` as JSON.
#[wasm_bindgen]
pub fn parse(raw: &str) -> String {
    let (metadata, blocks) = postdoc::parse_document(raw, &RenderOptions::default());
    serde_json::json!({
        "metadata": metadata,
        "blocks": blocks,
    })
    .to_string()
}

/// Render a source and return `{ metadata, html }` as a JS object.
///
/// `kind` is `"markdown"` (default) or `"html"`.
#[wasm_bindgen]
pub fn render_document(raw: &str, kind: Option<String>) -> Result<JsValue, JsError> {
    let kind = match kind.as_deref() {
        None | Some("markdown") | Some("md") => postdoc::SourceKind::Markdown,
        Some("html") => postdoc::SourceKind::Html,
        Some(other) => return Err(JsError::new(&format!("Unknown source kind '{other}'"))),
    };
    let doc = postdoc::render_document(raw, kind, &RenderOptions::default())?;
    Ok(serde_wasm_bindgen::to_value(&doc)?)
}

/// Check a source's front matter and return diagnostics as JSON.
///
/// Returns a JSON array of `{ severity, message, line, code }` objects.
/// An empty array means the header is clean.
#[wasm_bindgen]
pub fn check(raw: &str) -> String {
    let result = postdoc::parse_front_matter_with_diagnostics(raw);
    serde_json::to_string(&result.diagnostics).unwrap_or_else(|_| "[]".to_string())
}

use serde::{Deserialize, Serialize};

/// Errors returned by the opt-in fallible entry points.
///
/// The plain entry points (`render_markdown`, `sanitize_rich_html`, …) never
/// return these; they always produce some HTML.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Input is {size} bytes, above the limit of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Failed to serialize sanitized HTML: {message}")]
    Serialize { message: String },
}

/// A diagnostic message produced while reading a document.
///
/// Diagnostics are non-fatal: parsing continues and yields a best-effort
/// result even when diagnostics are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// 1-based source line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

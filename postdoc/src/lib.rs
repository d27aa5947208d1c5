//! `postdoc`: a renderer for blog posts.
//!
//! A post is either Markdown with an optional `---` front matter header, or
//! an HTML fragment exported from a word processor. This crate turns both
//! into clean HTML fragments ready to drop into a page template. It does no
//! I/O; every call is independent and keeps its state on the stack.
//!
//! # Quick start
//!
//! ```
//! let (meta, body) = postdoc::parse_front_matter("---\ntitle: Hi\n---\n# Hello\n");
//! assert_eq!(meta.title(), Some("Hi"));
//! assert_eq!(postdoc::render_markdown(&body), "<h1>Hello</h1>");
//!
//! let clean = postdoc::sanitize_rich_html("<p><span style=\"color:red\">hi</span></p>");
//! assert_eq!(clean, "<p>hi</p>");
//! ```

pub mod blocks;
pub mod error;
pub mod front_matter;
pub mod inline;
pub mod render_html;
pub mod sanitize;
pub mod types;

pub use error::*;
pub use front_matter::{FrontMatterResult, parse_front_matter, parse_front_matter_with_diagnostics};
pub use render_html::{render_markdown, render_markdown_with};
pub use sanitize::{sanitize_rich_html, try_sanitize_rich_html};
pub use types::*;

/// Render a whole source document.
///
/// Markdown sources have their front matter split off and the body rendered;
/// HTML sources are sanitized and carry no metadata.
pub fn render_document(
    raw: &str,
    kind: SourceKind,
    options: &RenderOptions,
) -> Result<RenderedDocument, RenderError> {
    render_html::check_size(raw, options)?;

    match kind {
        SourceKind::Markdown => {
            let doc = Document::parse(raw);
            let html = render_html::to_html(&blocks::parse_blocks(&doc.body, options));
            Ok(RenderedDocument {
                metadata: doc.metadata,
                html,
            })
        }
        SourceKind::Html => Ok(RenderedDocument {
            metadata: Metadata::new(),
            html: try_sanitize_rich_html(raw)?,
        }),
    }
}

/// Split a Markdown source and parse its body into blocks.
pub fn parse_document(raw: &str, options: &RenderOptions) -> (Metadata, Vec<Block>) {
    let doc = Document::parse(raw);
    let blocks = blocks::parse_blocks(&doc.body, options);
    (doc.metadata, blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_markdown_document() {
        let raw = "---\ntitle: Post\ntags:\n  - a\n---\n\nHello *world*";
        let doc = render_document(raw, SourceKind::Markdown, &RenderOptions::default()).unwrap();
        assert_eq!(doc.metadata.title(), Some("Post"));
        assert_eq!(doc.metadata.tags(), &["a".to_string()][..]);
        assert_eq!(doc.html, "<p>Hello <em>world</em></p>");
    }

    #[test]
    fn render_html_document() {
        let doc = render_document(
            "<p class=\"x\">Hi</p>",
            SourceKind::Html,
            &RenderOptions::default(),
        )
        .unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.html, "<p>Hi</p>");
    }

    #[test]
    fn render_document_checks_size() {
        let options = RenderOptions {
            max_input_bytes: Some(3),
            ..RenderOptions::default()
        };
        let err = render_document("abcd", SourceKind::Html, &options).unwrap_err();
        assert_eq!(err, RenderError::InputTooLarge { size: 4, limit: 3 });
        assert_eq!(err.to_string(), "Input is 4 bytes, above the limit of 3 bytes");
    }

    #[test]
    fn parse_document_returns_blocks() {
        let (meta, blocks) = parse_document("---\ntitle: T\n---\n# H", &RenderOptions::default());
        assert_eq!(meta.title(), Some("T"));
        assert_eq!(
            blocks,
            vec![Block::Heading {
                level: 1,
                text: "H".into()
            }]
        );
    }

    #[test]
    fn document_methods() {
        let doc = Document::parse("---\ndescription: d\n---\n- x");
        assert_eq!(doc.metadata.description(), Some("d"));
        assert_eq!(doc.to_html(), "<ul><li>x</li></ul>");
    }
}

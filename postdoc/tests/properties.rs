//! Property-based tests using proptest.
//!
//! These check that rendering never panics, that placeholder markers never
//! leak, and that the front matter reader and sanitizer behave as fixed
//! points where they should.

use postdoc::{
    RenderOptions, SourceKind, parse_front_matter, render_document, render_markdown,
    sanitize_rich_html,
};
use proptest::prelude::*;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// One allow-listed HTML element with plain text inside.
fn allowed_element() -> impl Strategy<Value = String> {
    let text = "[A-Za-z][A-Za-z0-9 .,]{0,20}";
    prop_oneof![
        (prop::sample::select(vec!["p", "b", "i", "em", "strong", "code", "h2"]), text)
            .prop_map(|(tag, t)| format!("<{tag}>{t}</{tag}>")),
        ("[a-z]{1,8}", text)
            .prop_map(|(path, t)| format!("<a href=\"/{path}\" title=\"{path}\">{t}</a>")),
        ("[a-z]{1,8}", "[A-Za-z ]{0,10}")
            .prop_map(|(name, alt)| format!("<img src=\"{name}.png\" alt=\"{alt}\">")),
    ]
}

proptest! {
    /// Any random string fed to the renderer should never cause a panic.
    #[test]
    fn any_markdown_no_panic(input in "\\PC{0,500}") {
        let html = render_markdown(&input);
        prop_assert!(!html.contains('\u{0}'), "marker leaked: {html:?}");
    }

    /// Markdown-looking noise with newlines and NULs never leaks a hole marker.
    #[test]
    fn no_hole_marker_in_output(input in "[-*_`>|#\\[\\]()!:a-z0-9 \\n\\x00]{0,300}") {
        let html = render_markdown(&input);
        prop_assert!(!html.contains('\u{0}'), "marker leaked: {html:?}");
    }

    /// Random HTML never panics the sanitizer.
    #[test]
    fn any_html_no_panic(input in "[<>/=\"a-z \\n]{0,300}") {
        let _ = sanitize_rich_html(&input);
        let _ = render_document(&input, SourceKind::Html, &RenderOptions::default());
    }

    /// Without a leading `---` line the input comes back untouched.
    #[test]
    fn header_less_input_is_body(input in "[a-z#> \\n][\\PC\\n]{0,200}") {
        let (meta, body) = parse_front_matter(&input);
        prop_assert!(meta.is_empty());
        prop_assert_eq!(body, input);
    }

    /// Sanitizing allow-listed HTML a second time changes nothing.
    #[test]
    fn sanitize_is_idempotent(parts in prop::collection::vec(allowed_element(), 1..6)) {
        let input = parts.concat();
        let once = sanitize_rich_html(&input);
        let twice = sanitize_rich_html(&once);
        prop_assert_eq!(twice, once);
    }

    /// Markdown-special characters inside a fence stay literal.
    #[test]
    fn fenced_code_is_escaped(code in "[*_`<>&a-z ]{1,40}") {
        prop_assume!(code.trim() != "```");
        let html = render_markdown(&format!("```\n{code}\n```"));
        prop_assert_eq!(html, format!("<pre><code>{}</code></pre>", escape(&code)));
    }

    /// Sequential numbering never produces per-item overrides.
    #[test]
    fn sequential_ordered_list(start in 0u64..1000, len in 1usize..10) {
        let body: Vec<String> = (0..len).map(|k| format!("{}. item", start + k as u64)).collect();
        let html = render_markdown(&body.join("\n"));
        prop_assert_eq!(html.matches("<li>").count(), len);
        prop_assert!(!html.contains("value="));
        prop_assert_eq!(html.contains("start="), start != 1);
    }
}

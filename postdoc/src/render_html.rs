//! HTML fragment renderer.
//!
//! Walks a [`Block`] tree and produces an HTML fragment. Inline text goes
//! through [`format_inline`] with one [`Holes`] table per call to
//! [`to_html`], resolved once at the end. Code content, URLs, titles and
//! alt text are escaped; other inline text is passed through as written.

use crate::blocks::parse_blocks;
use crate::error::RenderError;
use crate::inline::{Holes, format_inline};
use crate::types::{Block, List, ListItem, NoteKind, RenderOptions, Table, TaskState};

/// Render a Markdown body with default options.
pub fn render_markdown(body: &str) -> String {
    to_html(&parse_blocks(body, &RenderOptions::default()))
}

/// Render a Markdown body, enforcing the size limit in `options`.
pub fn render_markdown_with(body: &str, options: &RenderOptions) -> Result<String, RenderError> {
    check_size(body, options)?;
    Ok(to_html(&parse_blocks(body, options)))
}

pub(crate) fn check_size(input: &str, options: &RenderOptions) -> Result<(), RenderError> {
    match options.max_input_bytes {
        Some(limit) if input.len() > limit => Err(RenderError::InputTooLarge {
            size: input.len(),
            limit,
        }),
        _ => Ok(()),
    }
}

/// Render a block tree as an HTML fragment.
///
/// Blocks are joined with `\n`; each blank line adds an empty entry, so a
/// blank line between two blocks shows up as `\n\n`.
pub fn to_html(blocks: &[Block]) -> String {
    let mut holes = Holes::new();
    let html = render_blocks(blocks, &mut holes);
    let slots = holes.len();
    let html = holes.resolve(&html);
    tracing::debug!(blocks = blocks.len(), holes = slots, bytes = html.len(), "rendered html");
    html
}

/// Escape HTML special characters to prevent XSS.
pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_blocks(blocks: &[Block], holes: &mut Holes) -> String {
    let parts: Vec<String> = blocks.iter().map(|b| render_block(b, holes)).collect();
    parts.join("\n").trim_matches('\n').to_string()
}

fn render_block(block: &Block, holes: &mut Holes) -> String {
    match block {
        Block::Blank => String::new(),

        Block::Rule => "<hr>".to_string(),

        Block::Heading { level, text } => {
            format!("<h{level}>{}</h{level}>", format_inline(text, holes))
        }

        Block::Quote { children } => {
            format!("<blockquote>{}</blockquote>", render_blocks(children, holes))
        }

        Block::Note { note, children } => render_note(*note, children, holes),

        Block::List(list) => render_list(list, holes),

        Block::Table(table) => render_table(table, holes),

        Block::FencedCode { lang, content } => {
            let class = match lang {
                Some(l) => format!(" class=\"language-{}\"", escape_html(l)),
                None => String::new(),
            };
            format!("<pre><code{class}>{}</code></pre>", escape_html(content))
        }

        Block::IndentedCode { content } => {
            format!("<pre><code>{}</code></pre>", escape_html(content))
        }

        Block::Paragraph { lines } => {
            let lines: Vec<String> = lines.iter().map(|l| format_inline(l, holes)).collect();
            format!("<p>{}</p>", lines.join("<br>"))
        }
    }
}

fn render_note(note: NoteKind, children: &[Block], holes: &mut Holes) -> String {
    format!(
        "<div class=\"note {}\" role=\"note\"><strong>{}:</strong>{}</div>",
        note.class(),
        note.title(),
        render_blocks(children, holes),
    )
}

fn render_list(list: &List, holes: &mut Holes) -> String {
    let items: String = list.items.iter().map(|item| render_item(item, holes)).collect();
    if !list.ordered {
        return format!("<ul>{items}</ul>");
    }
    match list.start_attr() {
        Some(start) => format!("<ol start=\"{start}\">{items}</ol>"),
        None => format!("<ol>{items}</ol>"),
    }
}

fn render_item(item: &ListItem, holes: &mut Holes) -> String {
    let value = match item.value {
        Some(n) => format!(" value=\"{n}\""),
        None => String::new(),
    };
    let text = format_inline(&item.text, holes);
    let inner = match item.task {
        Some(state) => {
            let checked = if state == TaskState::Checked { " checked" } else { "" };
            format!(
                "<label class=\"task-item\"><input type=\"checkbox\" disabled{checked}> <span>{text}</span></label>"
            )
        }
        None => text,
    };
    format!("<li{value}>{inner}</li>")
}

fn render_table(table: &Table, holes: &mut Holes) -> String {
    let mut html = String::from("<table><thead><tr>");
    for (idx, cell) in table.header.iter().enumerate() {
        html.push_str(&format!(
            "<th style=\"text-align:{}\">{}</th>",
            table.alignment(idx).as_str(),
            format_inline(cell, holes)
        ));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        html.push_str("<tr>");
        for (idx, cell) in row.iter().enumerate() {
            html.push_str(&format!(
                "<td style=\"text-align:{}\">{}</td>",
                table.alignment(idx).as_str(),
                format_inline(cell, holes)
            ));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Alignment;
    use pretty_assertions::assert_eq;

    #[test]
    fn end_to_end_example() {
        assert_eq!(
            render_markdown("# Title\n\nSome **bold** and `code`.\n"),
            "<h1>Title</h1>\n\n<p>Some <strong>bold</strong> and <code>code</code>.</p>"
        );
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(render_markdown(""), "");
        assert_eq!(render_markdown("\n\n  \n"), "");
    }

    #[test]
    fn paragraph_lines_join_with_br() {
        assert_eq!(render_markdown("one\n  two  "), "<p>one<br>two</p>");
    }

    #[test]
    fn rule_and_heading() {
        assert_eq!(render_markdown("## Sub *x*\n***"), "<h2>Sub <em>x</em></h2>\n<hr>");
    }

    #[test]
    fn fenced_code_is_escaped_verbatim() {
        assert_eq!(
            render_markdown("```html\n<b>**x**</b> & `y`\n```"),
            "<pre><code class=\"language-html\">&lt;b&gt;**x**&lt;/b&gt; &amp; `y`</code></pre>"
        );
    }

    #[test]
    fn indented_code() {
        assert_eq!(
            render_markdown("    if a < b {}"),
            "<pre><code>if a &lt; b {}</code></pre>"
        );
    }

    #[test]
    fn quote_renders_recursively() {
        assert_eq!(
            render_markdown("> Hello *there*\n>\n> - a"),
            "<blockquote><p>Hello <em>there</em></p>\n\n<ul><li>a</li></ul></blockquote>"
        );
    }

    #[test]
    fn note_container() {
        assert_eq!(
            render_markdown("> **Важно:** text"),
            "<div class=\"note important\" role=\"note\"><strong>Важно:</strong><p>text</p></div>"
        );
    }

    #[test]
    fn note_with_code_span() {
        assert_eq!(
            render_markdown("> Tip: run `cargo *x*`"),
            "<div class=\"note tip\" role=\"note\"><strong>Совет:</strong><p>run <code>cargo *x*</code></p></div>"
        );
    }

    #[test]
    fn ordered_list_attributes() {
        assert_eq!(
            render_markdown("1. a\n3. b\n4. c"),
            "<ol><li>a</li><li value=\"3\">b</li><li>c</li></ol>"
        );
        assert_eq!(render_markdown("3. a\n4. b"), "<ol start=\"3\"><li>a</li><li>b</li></ol>");
    }

    #[test]
    fn task_list_items() {
        assert_eq!(
            render_markdown("- [x] done\n- [ ] *todo*"),
            "<ul><li><label class=\"task-item\"><input type=\"checkbox\" disabled checked> <span>done</span></label></li>\
             <li><label class=\"task-item\"><input type=\"checkbox\" disabled> <span><em>todo</em></span></label></li></ul>"
        );
    }

    #[test]
    fn table_markup() {
        assert_eq!(
            render_markdown("| a | b |\n| --- | ---: |\n| `x|y` | **z** |\n| 1 | 2 | 3 |"),
            "<table><thead><tr><th style=\"text-align:left\">a</th><th style=\"text-align:right\">b</th></tr></thead>\
             <tbody><tr><td style=\"text-align:left\"><code>x|y</code></td><td style=\"text-align:right\"><strong>z</strong></td></tr>\
             <tr><td style=\"text-align:left\">1</td><td style=\"text-align:right\">2</td><td style=\"text-align:left\">3</td></tr></tbody></table>"
        );
    }

    #[test]
    fn to_html_from_blocks() {
        let blocks = vec![
            Block::Table(Table {
                header: vec!["h".into()],
                alignments: vec![Alignment::Center],
                rows: vec![],
            }),
            Block::Blank,
            Block::Rule,
        ];
        assert_eq!(
            to_html(&blocks),
            "<table><thead><tr><th style=\"text-align:center\">h</th></tr></thead><tbody></tbody></table>\n\n<hr>"
        );
    }

    #[test]
    fn raw_html_passes_through() {
        assert_eq!(render_markdown("a <kbd>Ctrl</kbd>"), "<p>a <kbd>Ctrl</kbd></p>");
    }

    #[test]
    fn hole_markers_cannot_be_forged() {
        assert_eq!(render_markdown("x\u{0}0\u{0}y `c`"), "<p>x0y <code>c</code></p>");
    }

    #[test]
    fn size_limit() {
        let options = RenderOptions {
            max_input_bytes: Some(4),
            ..RenderOptions::default()
        };
        assert_eq!(
            render_markdown_with("hello", &options),
            Err(RenderError::InputTooLarge { size: 5, limit: 4 })
        );
        assert_eq!(render_markdown_with("hi", &options), Ok("<p>hi</p>".to_string()));
    }
}

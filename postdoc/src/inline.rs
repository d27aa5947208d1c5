//! Inline span formatter.
//!
//! Formats one logical run of text (a heading, a paragraph line, a table
//! cell, a list item). Code spans, images, links and autolinks are rendered
//! first and parked in [`Holes`], so the emphasis passes that run afterwards
//! never touch their contents. The markers left in the text are swapped back
//! for literal HTML by [`Holes::resolve`] once the owning render call is done.

use crate::render_html::escape_html;

/// Delimiter around a hole index. Input text is stripped of NUL before
/// rendering, so every NUL in the working text belongs to a marker.
pub(crate) const HOLE_DELIM: char = '\u{0}';

/// Ordered table of pre-rendered HTML fragments for one render call.
#[derive(Debug, Default)]
pub struct Holes {
    slots: Vec<String>,
}

impl Holes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Park `html` and return the marker that stands in for it.
    pub fn insert(&mut self, html: String) -> String {
        let idx = self.slots.len();
        self.slots.push(html);
        format!("{HOLE_DELIM}{idx}{HOLE_DELIM}")
    }

    /// Replace every marker in `text` with its HTML.
    ///
    /// Consumes the table: a render call resolves its holes exactly once.
    /// A slot may contain markers of earlier slots (link text with a code
    /// span); those are expanded in place.
    pub fn resolve(self, text: &str) -> String {
        self.expand(text)
    }

    /// Replace every marker in `text` with its HTML, keeping the table.
    ///
    /// Used when a fragment must be escaped as a whole before it is parked,
    /// such as an attribute value that contains a code span.
    pub fn expand(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        self.expand_into(text, usize::MAX, &mut out);
        out
    }

    fn expand_into(&self, text: &str, limit: usize, out: &mut String) {
        let mut rest = text;
        while let Some(start) = rest.find(HOLE_DELIM) {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match parse_marker(after) {
                Some((idx, len)) => {
                    if idx < limit {
                        if let Some(html) = self.slots.get(idx) {
                            self.expand_into(html, idx, out);
                        }
                    }
                    rest = &after[len..];
                }
                None => rest = after,
            }
        }
        out.push_str(rest);
    }
}

/// Parse `123\0` at the start of `s`. Returns `(index, bytes consumed)`.
fn parse_marker(s: &str) -> Option<(usize, usize)> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || !s[digits..].starts_with(HOLE_DELIM) {
        return None;
    }
    let idx = s[..digits].parse().ok()?;
    Some((idx, digits + HOLE_DELIM.len_utf8()))
}

type SealPass = fn(&str, &mut Holes) -> String;

/// Passes that render a construct into a hole, in precedence order.
const SEAL_PASSES: [SealPass; 4] = [code_spans, images, links, autolinks];

/// Format one run of text. The result may contain hole markers.
pub fn format_inline(text: &str, holes: &mut Holes) -> String {
    let mut current = text.to_string();
    for pass in SEAL_PASSES {
        current = pass(&current, holes);
    }
    format_emphasis(&current)
}

/// `` `code` `` → `<code>` with the content escaped verbatim.
fn code_spans(text: &str, holes: &mut Holes) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('`') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['`', '\n']) {
            Some(close) if close > 0 && after[close..].starts_with('`') => {
                let code = &after[..close];
                out.push_str(&holes.insert(format!("<code>{}</code>", escape_html(code))));
                rest = &after[close + 1..];
            }
            _ => {
                out.push('`');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// `![alt](url "title")` → `<img>`.
///
/// Every part is an attribute value, so earlier holes inside it are expanded
/// and escaped along with the surrounding text.
fn images(text: &str, holes: &mut Holes) -> String {
    replace_bracketed(text, "![", true, |label, target, holes| {
        let title = title_attr(target.title, holes);
        let html = format!(
            "<img src=\"{}\" alt=\"{}\"{title}>",
            escape_html(&holes.expand(target.url)),
            escape_html(&holes.expand(label)),
        );
        holes.insert(html)
    }, holes)
}

/// `[text](url "title")` → `<a>`. The text is trusted as-is, but still gets
/// the emphasis passes before it is sealed; its holes stay as markers and
/// resolve to markup. URL and title holes are expanded and escaped.
fn links(text: &str, holes: &mut Holes) -> String {
    replace_bracketed(text, "[", false, |label, target, holes| {
        let title = title_attr(target.title, holes);
        let html = format!(
            "<a href=\"{}\"{title}>{}</a>",
            escape_html(&holes.expand(target.url)),
            format_emphasis(label),
        );
        holes.insert(html)
    }, holes)
}

fn title_attr(title: Option<&str>, holes: &Holes) -> String {
    match title {
        Some(t) => format!(" title=\"{}\"", escape_html(&holes.expand(t))),
        None => String::new(),
    }
}

/// Destination part of a link or image.
struct Target<'a> {
    url: &'a str,
    title: Option<&'a str>,
}

/// Find `opener label ](target)` constructs and replace each with `render`.
fn replace_bracketed(
    text: &str,
    opener: &str,
    allow_empty_label: bool,
    render: impl Fn(&str, Target<'_>, &mut Holes) -> String,
    holes: &mut Holes,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(opener) {
        let after = &rest[start + opener.len()..];
        let Some(close) = after.find(']') else {
            // No `]` anywhere further on, so no later opener can match either.
            break;
        };
        out.push_str(&rest[..start]);
        let label = &after[..close];
        if label.is_empty() && !allow_empty_label {
            // Only an opener directly before `]` has an empty label.
            let step = opener.chars().next().map_or(1, char::len_utf8);
            out.push_str(&rest[start..start + step]);
            rest = &rest[start + step..];
            continue;
        }

        let parsed = after[close + 1..]
            .strip_prefix('(')
            .and_then(parse_target)
            .map(|(target, used)| (target, close + 2 + used));

        match parsed {
            Some((target, consumed)) => {
                out.push_str(&render(label, target, holes));
                rest = &after[consumed..];
            }
            None => {
                // Every opener before this `]` shares the same failed target.
                out.push_str(&rest[start..start + opener.len() + close]);
                rest = &after[close..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse `url "title")` (the part after the opening paren).
/// Returns the target and the number of bytes consumed including `)`.
fn parse_target(s: &str) -> Option<(Target<'_>, usize)> {
    let url_end = s.find(|c: char| c.is_whitespace() || c == ')')?;
    if url_end == 0 {
        return None;
    }
    let url = &s[..url_end];
    let after_url = &s[url_end..];

    if after_url.starts_with(')') {
        return Some((Target { url, title: None }, url_end + 1));
    }

    let trimmed = after_url.trim_start();
    let gap = after_url.len() - trimmed.len();
    let quoted = trimmed.strip_prefix('"')?;
    let title_end = quoted.find('"')?;
    if !quoted[title_end + 1..].starts_with(')') {
        return None;
    }
    let title = &quoted[..title_end];
    Some((
        Target {
            url,
            title: Some(title),
        },
        url_end + gap + 1 + title_end + 2,
    ))
}

const AUTOLINK_SCHEMES: [&str; 3] = ["https://", "http://", "mailto:"];

/// Bare `http://`, `https://` and `mailto:` URLs → `<a>`.
///
/// A URL must start the text or follow whitespace or `(`; it runs until
/// whitespace, `)`, `<` or a hole marker, minus trailing sentence punctuation.
fn autolinks(text: &str, holes: &mut Holes) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    let mut idx = 0;

    while idx < text.len() {
        let rest = &text[idx..];
        let at_boundary = prev.is_none_or(|c| c.is_whitespace() || c == '(');

        if at_boundary {
            if let Some(len) = autolink_len(rest) {
                let url = &rest[..len];
                let escaped = escape_html(url);
                out.push_str(&holes.insert(format!("<a href=\"{escaped}\">{escaped}</a>")));
                prev = url.chars().next_back();
                idx += len;
                continue;
            }
        }

        let Some(c) = rest.chars().next() else { break };
        out.push(c);
        prev = Some(c);
        idx += c.len_utf8();
    }
    out
}

fn autolink_len(s: &str) -> Option<usize> {
    let scheme = AUTOLINK_SCHEMES.iter().find(|p| s.starts_with(**p))?;
    let end = s
        .find(|c: char| c.is_whitespace() || matches!(c, ')' | '<' | HOLE_DELIM))
        .unwrap_or(s.len());
    let url = s[..end].trim_end_matches(['.', ',', ';', ':', '!', '?']);
    (url.len() > scheme.len()).then_some(url.len())
}

/// Strikethrough, strong and emphasis, in that order.
pub(crate) fn format_emphasis(text: &str) -> String {
    let text = wrap_spans(text, '~', 2, "del", false);
    let text = wrap_spans(&text, '*', 2, "strong", false);
    let text = wrap_spans(&text, '_', 2, "strong", false);
    let text = wrap_spans(&text, '*', 1, "em", true);
    wrap_spans(&text, '_', 1, "em", true)
}

/// Wrap `marker×width … marker×width` runs in `<tag>`.
///
/// The content may not contain `marker`. When `bounded`, the opening run must
/// follow start/whitespace/punctuation, the closing run must precede
/// end/whitespace/punctuation, and the content may not start or end with
/// whitespace, which keeps `snake_case` and `2 * 3 * 4` intact.
fn wrap_spans(text: &str, marker: char, width: usize, tag: &str, bounded: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if let Some(close) = match_span(&chars, i, marker, width, bounded) {
            out.push('<');
            out.push_str(tag);
            out.push('>');
            out.extend(&chars[i + width..close]);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
            i = close + width;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// If a span opens at `start`, return the index of its closing run.
fn match_span(chars: &[char], start: usize, marker: char, width: usize, bounded: bool) -> Option<usize> {
    if !run_at(chars, start, marker, width) {
        return None;
    }
    if bounded && !start.checked_sub(1).is_none_or(|p| is_flank(chars[p], marker)) {
        return None;
    }

    let open_end = start + width;
    let close = open_end + chars[open_end..].iter().position(|&c| c == marker)?;
    if close == open_end || !run_at(chars, close, marker, width) {
        return None;
    }

    if bounded {
        if chars[open_end].is_whitespace() || chars[close - 1].is_whitespace() {
            return None;
        }
        if !chars.get(close + width).is_none_or(|&c| is_flank(c, marker)) {
            return None;
        }
    }
    Some(close)
}

fn run_at(chars: &[char], at: usize, marker: char, width: usize) -> bool {
    chars.len() >= at + width && chars[at..at + width].iter().all(|&c| c == marker)
}

/// Characters that may sit right outside an emphasis marker.
fn is_flank(c: char, marker: char) -> bool {
    c != marker
        && (c.is_whitespace()
            || c.is_ascii_punctuation()
            || c == HOLE_DELIM
            || matches!(c, '«' | '»' | '„' | '“' | '”' | '—' | '–' | '…'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(text: &str) -> String {
        let mut holes = Holes::new();
        let html = format_inline(text, &mut holes);
        holes.resolve(&html)
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("Just words."), "Just words.");
    }

    #[test]
    fn code_span_is_escaped_and_protected() {
        assert_eq!(
            render("use `**not bold** <b>` here"),
            "use <code>**not bold** &lt;b&gt;</code> here"
        );
    }

    #[test]
    fn empty_or_unclosed_backticks_stay_literal() {
        assert_eq!(render("a `` b"), "a `` b");
        assert_eq!(render("a ` b"), "a ` b");
    }

    #[test]
    fn image_with_title() {
        assert_eq!(
            render(r#"![A "cat"](/img/cat.png "My cat")"#),
            r#"<img src="/img/cat.png" alt="A &quot;cat&quot;" title="My cat">"#
        );
    }

    #[test]
    fn image_with_empty_alt() {
        assert_eq!(render("![](a.png)"), r#"<img src="a.png" alt="">"#);
    }

    #[test]
    fn link_text_is_formatted_but_not_escaped() {
        assert_eq!(
            render("see [the **docs**](https://x.dev/a?b=1&c=2)"),
            r#"see <a href="https://x.dev/a?b=1&amp;c=2">the <strong>docs</strong></a>"#
        );
    }

    #[test]
    fn link_with_title() {
        assert_eq!(
            render(r#"[x](/y "T")"#),
            r#"<a href="/y" title="T">x</a>"#
        );
    }

    #[test]
    fn broken_link_syntax_stays_literal() {
        assert_eq!(render("[x] (y)"), "[x] (y)");
        assert_eq!(render("[](y)"), "[](y)");
        assert_eq!(render("[x](a b)"), "[x](a b)");
    }

    #[test]
    fn code_span_in_image_alt_is_escaped_text() {
        assert_eq!(
            render("![`x`](a.png)"),
            r#"<img src="a.png" alt="&lt;code&gt;x&lt;/code&gt;">"#
        );
    }

    #[test]
    fn code_span_in_link_target_is_escaped_text() {
        assert_eq!(render("[a](`u`)"), r#"<a href="&lt;code&gt;u&lt;/code&gt;">a</a>"#);
        assert_eq!(
            render(r#"[a](/u "`t`")"#),
            r#"<a href="/u" title="&lt;code&gt;t&lt;/code&gt;">a</a>"#
        );
    }

    #[test]
    fn code_span_in_link_text_stays_markup() {
        assert_eq!(render("[`a`](/x)"), r#"<a href="/x"><code>a</code></a>"#);
    }

    #[test]
    fn unmatched_brackets_stay_literal() {
        let many = "[".repeat(100_000);
        assert_eq!(render(&many), many);
        let images = "![".repeat(50_000);
        assert_eq!(render(&images), images);
        assert_eq!(render("[a] [b](c)"), r#"[a] <a href="c">b</a>"#);
        assert_eq!(render("[[a]](b)"), "[[a]](b)");
    }

    #[test]
    fn expand_keeps_the_table() {
        let mut holes = Holes::new();
        let marker = holes.insert("<b>x</b>".into());
        assert_eq!(holes.expand(&format!("a{marker}")), "a<b>x</b>");
        assert_eq!(holes.len(), 1);
        assert_eq!(holes.resolve(&marker), "<b>x</b>");
    }

    #[test]
    fn image_inside_link() {
        assert_eq!(
            render("[![logo](l.png)](/home)"),
            r#"<a href="/home"><img src="l.png" alt="logo"></a>"#
        );
    }

    #[test]
    fn autolink_bare_url() {
        assert_eq!(
            render("go to https://example.com/path_with_underscores_ now"),
            r#"go to <a href="https://example.com/path_with_underscores_">https://example.com/path_with_underscores_</a> now"#
        );
    }

    #[test]
    fn autolink_drops_trailing_punctuation() {
        assert_eq!(
            render("Read http://a.ru/x."),
            r#"Read <a href="http://a.ru/x">http://a.ru/x</a>."#
        );
    }

    #[test]
    fn autolink_in_parentheses_and_mailto() {
        assert_eq!(
            render("(mailto:info@example.com)"),
            r#"(<a href="mailto:info@example.com">mailto:info@example.com</a>)"#
        );
    }

    #[test]
    fn autolink_needs_boundary() {
        assert_eq!(render("xhttps://a.b"), "xhttps://a.b");
        assert_eq!(render("https://"), "https://");
    }

    #[test]
    fn url_inside_link_is_not_autolinked() {
        assert_eq!(
            render("[https://a.b](https://a.b)"),
            r#"<a href="https://a.b">https://a.b</a>"#
        );
    }

    #[test]
    fn strong_strike_and_emphasis() {
        assert_eq!(
            render("**b** __c__ ~~d~~ *e* _f_"),
            "<strong>b</strong> <strong>c</strong> <del>d</del> <em>e</em> <em>f</em>"
        );
    }

    #[test]
    fn emphasis_does_not_fire_inside_words() {
        assert_eq!(render("snake_case_name"), "snake_case_name");
        assert_eq!(render("2*3*4"), "2*3*4");
        assert_eq!(render("2 * 3 * 4"), "2 * 3 * 4");
    }

    #[test]
    fn emphasis_next_to_punctuation() {
        assert_eq!(render("(*a*), _b_."), "(<em>a</em>), <em>b</em>.");
    }

    #[test]
    fn triple_star_nests() {
        assert_eq!(render("***x***"), "<em><strong>x</strong></em>");
    }

    #[test]
    fn emphasis_around_code_span() {
        assert_eq!(render("*`x`*"), "<em><code>x</code></em>");
    }

    #[test]
    fn holes_resolve_nested_slots_once() {
        let mut holes = Holes::new();
        let inner = holes.insert("<code>x</code>".into());
        let outer = holes.insert(format!("<a href=\"/\">{inner}</a>"));
        assert_eq!(holes.len(), 2);
        assert_eq!(holes.resolve(&format!("[{outer}]")), "[<a href=\"/\"><code>x</code></a>]");
    }

    #[test]
    fn unknown_marker_resolves_to_nothing() {
        let holes = Holes::new();
        assert_eq!(holes.resolve("a\u{0}7\u{0}b"), "ab");
    }
}

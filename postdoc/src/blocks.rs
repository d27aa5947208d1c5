//! Block parser.
//!
//! Turns a Markdown body into a [`Block`] tree. Each line is classified by
//! walking [`LINE_RULES`] top to bottom; the first matching rule decides the
//! kind of block that starts there, and that block then consumes lines under
//! its own continuation rule. Quote and note bodies are parsed recursively,
//! one nesting level per call, down to `RenderOptions::max_nesting`.

use crate::inline::HOLE_DELIM;
use crate::types::{
    Alignment, Block, List, ListItem, NoteKind, RenderOptions, Table, TaskState,
};

/// Kind of block a line starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Fence,
    Blank,
    Rule,
    Heading,
    Quote,
    Table,
    IndentedCode,
    List,
    Paragraph,
}

type LineRule = (LineKind, fn(&Lines<'_>, usize) -> bool);

/// Classification rules in priority order. Paragraph is the fallback.
pub const LINE_RULES: &[LineRule] = &[
    (LineKind::Fence, starts_fence),
    (LineKind::Blank, starts_blank),
    (LineKind::Rule, starts_rule),
    (LineKind::Heading, starts_heading),
    (LineKind::Quote, starts_quote),
    (LineKind::Table, starts_table),
    (LineKind::IndentedCode, starts_indented_code),
    (LineKind::List, starts_list),
];

/// Source lines of one nesting level.
pub struct Lines<'a> {
    lines: Vec<&'a str>,
    /// Index of the last fence closer; an opener needs a closer after it.
    last_fence_close: Option<usize>,
}

impl<'a> Lines<'a> {
    pub fn new(text: &'a str) -> Self {
        let lines: Vec<&str> = text.split('\n').collect();
        let last_fence_close = lines.iter().rposition(|l| is_fence_close(l));
        Self {
            lines,
            last_fence_close,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line `i`, or `""` past the end.
    pub fn get(&self, i: usize) -> &'a str {
        self.lines.get(i).copied().unwrap_or("")
    }
}

/// Decide what kind of block starts at line `i`.
pub fn classify(lines: &Lines<'_>, i: usize) -> LineKind {
    LINE_RULES
        .iter()
        .find(|(_, matches)| matches(lines, i))
        .map_or(LineKind::Paragraph, |(kind, _)| *kind)
}

/// Parse a Markdown body into blocks.
///
/// Line endings are normalised, NUL characters dropped and closed HTML
/// comments outside fenced code removed before classification.
pub fn parse_blocks(body: &str, options: &RenderOptions) -> Vec<Block> {
    let text = body
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(HOLE_DELIM, "");
    let text = strip_comments(&text);
    let blocks = parse_level(&text, 0, options);
    tracing::debug!(blocks = blocks.len(), "parsed markdown body");
    blocks
}

fn parse_level(text: &str, depth: usize, options: &RenderOptions) -> Vec<Block> {
    let lines = Lines::new(text);
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let (block, next) = match classify(&lines, i) {
            LineKind::Fence => parse_fence(&lines, i),
            LineKind::Blank => (Block::Blank, i + 1),
            LineKind::Rule => (Block::Rule, i + 1),
            LineKind::Heading => parse_heading(&lines, i),
            LineKind::Quote => parse_quote(&lines, i, depth, options),
            LineKind::Table => parse_table(&lines, i),
            LineKind::IndentedCode => parse_indented_code(&lines, i),
            LineKind::List => parse_list(&lines, i),
            LineKind::Paragraph => parse_paragraph(&lines, i),
        };
        blocks.push(block);
        i = next;
    }

    blocks
}

// ------------------------------------------------------------------
// Preprocessing
// ------------------------------------------------------------------

/// Remove `<!-- … -->` comments outside fenced code. An unterminated
/// comment is left in place.
fn strip_comments(text: &str) -> String {
    if !text.contains("<!--") {
        return text.to_string();
    }

    let lines = Lines::new(text);
    let mut out: Vec<String> = Vec::new();
    let mut region: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if starts_fence(&lines, i) {
            let close = fence_close_after(&lines, i).unwrap_or(i);
            if !region.is_empty() {
                out.push(remove_closed_comments(&region.join("\n")));
                region.clear();
            }
            out.extend((i..=close).map(|j| lines.get(j).to_string()));
            i = close + 1;
        } else {
            region.push(lines.get(i));
            i += 1;
        }
    }
    if !region.is_empty() {
        out.push(remove_closed_comments(&region.join("\n")));
    }

    out.join("\n")
}

fn remove_closed_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<!--") {
        let Some(len) = rest[start + 4..].find("-->") else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + 4 + len + 3..];
    }
    out.push_str(rest);
    out
}

// ------------------------------------------------------------------
// Line predicates
// ------------------------------------------------------------------

/// Language tag of a fence opener: up to three spaces, then three backticks,
/// then an optional `[A-Za-z0-9_-]` tag.
fn fence_open(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let tag = line[indent..].strip_prefix("```")?.trim();
    tag.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        .then_some(tag)
}

fn is_fence_close(line: &str) -> bool {
    line.trim() == "```"
}

fn fence_close_after(lines: &Lines<'_>, open: usize) -> Option<usize> {
    (open + 1..lines.len()).find(|&j| is_fence_close(lines.get(j)))
}

fn starts_fence(lines: &Lines<'_>, i: usize) -> bool {
    fence_open(lines.get(i)).is_some() && lines.last_fence_close.is_some_and(|c| c > i)
}

fn starts_blank(lines: &Lines<'_>, i: usize) -> bool {
    lines.get(i).trim().is_empty()
}

fn starts_rule(lines: &Lines<'_>, i: usize) -> bool {
    is_rule(lines.get(i))
}

fn starts_heading(lines: &Lines<'_>, i: usize) -> bool {
    heading(lines.get(i)).is_some()
}

fn starts_quote(lines: &Lines<'_>, i: usize) -> bool {
    strip_quote_marker(lines.get(i)).is_some()
}

fn starts_indented_code(lines: &Lines<'_>, i: usize) -> bool {
    is_indented_code(lines.get(i))
}

fn starts_list(lines: &Lines<'_>, i: usize) -> bool {
    list_marker(lines.get(i)).is_some()
}

fn is_rule(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3
        && ['-', '_', '*']
            .iter()
            .any(|&m| t.chars().all(|c| c == m))
}

/// `## Text` → `(2, "Text")`.
fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then_some((level as u8, text))
}

/// Strip one level of `>` (or an already-escaped `&gt;`) and one following
/// space or tab.
fn strip_quote_marker(line: &str) -> Option<&str> {
    let t = line.trim_start();
    let rest = t.strip_prefix("&gt;").or_else(|| t.strip_prefix('>'))?;
    Some(rest.strip_prefix([' ', '\t']).unwrap_or(rest))
}

fn starts_table(lines: &Lines<'_>, i: usize) -> bool {
    i + 1 < lines.len() && lines.get(i).contains('|') && is_table_separator(lines.get(i + 1))
}

fn is_table_separator(line: &str) -> bool {
    let cells = split_row(line);
    cells.len() >= 2 && cells.iter().all(|c| is_separator_cell(c))
}

fn is_separator_cell(cell: &str) -> bool {
    let inner = cell.strip_prefix(':').unwrap_or(cell);
    let inner = inner.strip_suffix(':').unwrap_or(inner);
    inner.len() >= 3 && inner.bytes().all(|b| b == b'-')
}

fn is_indented_code(line: &str) -> bool {
    let body = line.trim_start();
    !body.is_empty() && line[..line.len() - body.len()].chars().count() >= 4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListFamily {
    Unordered,
    Ordered,
}

/// Detect a list marker. For ordered items also returns the number
/// (`None` if it overflows) and, for both, the item text.
fn list_marker(line: &str) -> Option<(ListFamily, Option<u64>, &str)> {
    let t = line.trim_start();

    if let Some(rest) = t.strip_prefix(['-', '*', '+']) {
        if rest.starts_with(char::is_whitespace) {
            return Some((ListFamily::Unordered, None, rest.trim()));
        }
        return None;
    }

    let digits = t.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = t[digits..].strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((ListFamily::Ordered, t[..digits].parse().ok(), rest.trim()))
}

// ------------------------------------------------------------------
// Block parsers. Each returns the block and the index of the next line.
// ------------------------------------------------------------------

fn parse_fence(lines: &Lines<'_>, i: usize) -> (Block, usize) {
    let lang = fence_open(lines.get(i))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string);
    let close = fence_close_after(lines, i).unwrap_or(lines.len());
    let content = (i + 1..close)
        .map(|j| lines.get(j))
        .collect::<Vec<_>>()
        .join("\n");
    (Block::FencedCode { lang, content }, close + 1)
}

fn parse_heading(lines: &Lines<'_>, i: usize) -> (Block, usize) {
    let (level, text) = heading(lines.get(i)).unwrap_or((1, ""));
    let block = Block::Heading {
        level,
        text: text.to_string(),
    };
    (block, i + 1)
}

fn parse_quote(
    lines: &Lines<'_>,
    start: usize,
    depth: usize,
    options: &RenderOptions,
) -> (Block, usize) {
    let mut body: Vec<&str> = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let Some(inner) = strip_quote_marker(lines.get(i)) else {
            break;
        };
        body.push(inner);
        i += 1;
    }

    if depth >= options.max_nesting {
        tracing::warn!(
            depth,
            line = start + 1,
            "quote nesting limit reached; keeping the rest as plain text"
        );
        let text = (start..i)
            .map(|j| lines.get(j).trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        return (Block::Paragraph { lines: text }, i);
    }

    let first = body.first().copied().unwrap_or("");
    let block = match match_note_label(first) {
        Some((note, rest)) => {
            let text = std::iter::once(rest)
                .chain(body.iter().skip(1).copied())
                .collect::<Vec<_>>()
                .join("\n");
            Block::Note {
                note,
                children: parse_level(text.trim(), depth + 1, options),
            }
        }
        None => Block::Quote {
            children: parse_level(&body.join("\n"), depth + 1, options),
        },
    };
    (block, i)
}

fn parse_table(lines: &Lines<'_>, start: usize) -> (Block, usize) {
    let header = split_row(lines.get(start));
    let mut alignments: Vec<Alignment> = split_row(lines.get(start + 1))
        .iter()
        .map(|c| column_alignment(c))
        .collect();
    alignments.resize(header.len(), Alignment::Left);

    let mut rows = Vec::new();
    let mut i = start + 2;
    while i < lines.len() {
        let line = lines.get(i);
        if line.trim().is_empty() || !line.contains('|') || is_rule(line) || heading(line).is_some() {
            break;
        }
        rows.push(split_row(line));
        i += 1;
    }

    (
        Block::Table(Table {
            header,
            alignments,
            rows,
        }),
        i,
    )
}

fn column_alignment(cell: &str) -> Alignment {
    match (cell.starts_with(':'), cell.ends_with(':')) {
        (true, true) => Alignment::Center,
        (_, true) => Alignment::Right,
        _ => Alignment::Left,
    }
}

/// Split a table row into trimmed cells. Outer pipes are optional; pipes
/// inside backtick code spans do not split.
pub fn split_row(row: &str) -> Vec<String> {
    let mut s = row.trim();
    s = s.strip_prefix('|').unwrap_or(s);
    s = s.strip_suffix('|').unwrap_or(s);

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut rest = s;
    while let Some(c) = rest.chars().next() {
        match c {
            '|' => {
                cells.push(cell.trim().to_string());
                cell.clear();
                rest = &rest[1..];
            }
            '`' => match rest[1..].find('`') {
                Some(close) => {
                    cell.push_str(&rest[..close + 2]);
                    rest = &rest[close + 2..];
                }
                None => {
                    cell.push('`');
                    rest = &rest[1..];
                }
            },
            _ => {
                cell.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn parse_indented_code(lines: &Lines<'_>, start: usize) -> (Block, usize) {
    let mut code = Vec::new();
    let mut i = start;
    while i < lines.len() && is_indented_code(lines.get(i)) {
        let line = lines.get(i);
        code.push(line.strip_prefix("    ").unwrap_or(line));
        i += 1;
    }
    let block = Block::IndentedCode {
        content: code.join("\n"),
    };
    (block, i)
}

fn parse_list(lines: &Lines<'_>, start: usize) -> (Block, usize) {
    let Some((family, _, _)) = list_marker(lines.get(start)) else {
        return parse_paragraph(lines, start);
    };
    let ordered = family == ListFamily::Ordered;

    let mut items = Vec::new();
    let mut list_start: Option<u64> = None;
    let mut prev: Option<u64> = None;
    let mut i = start;

    while i < lines.len() {
        let Some((item_family, number, text)) = list_marker(lines.get(i)) else {
            break;
        };
        if item_family != family || classify(lines, i) != LineKind::List {
            break;
        }

        let mut value = None;
        if ordered {
            if list_start.is_none() {
                list_start = number;
            }
            if let (Some(p), Some(n)) = (prev, number) {
                if p.checked_add(1) != Some(n) {
                    value = Some(n);
                }
            }
            prev = number.or_else(|| Some(prev.map_or(1, |p| p.saturating_add(1))));
        }

        let (task, text) = match task_marker(text) {
            Some((state, rest)) => (Some(state), rest),
            None => (None, text),
        };
        items.push(ListItem {
            value,
            task,
            text: text.to_string(),
        });
        i += 1;
    }

    let list = List {
        ordered,
        start: list_start,
        items,
    };
    (Block::List(list), i)
}

/// `[ ] text` / `[x] text` → checkbox state and the remaining text.
fn task_marker(text: &str) -> Option<(TaskState, &str)> {
    let rest = text.strip_prefix('[')?;
    let mut chars = rest.chars();
    let state = match chars.next()? {
        ' ' => TaskState::Unchecked,
        'x' | 'X' => TaskState::Checked,
        _ => return None,
    };
    let after = chars.as_str().strip_prefix(']')?;
    if !after.starts_with(char::is_whitespace) {
        return None;
    }
    Some((state, after.trim_start()))
}

fn parse_paragraph(lines: &Lines<'_>, start: usize) -> (Block, usize) {
    let mut para = vec![lines.get(start).trim().to_string()];
    let mut i = start + 1;
    while i < lines.len() && classify(lines, i) == LineKind::Paragraph {
        para.push(lines.get(i).trim().to_string());
        i += 1;
    }
    (Block::Paragraph { lines: para }, i)
}

// ------------------------------------------------------------------
// Note labels
// ------------------------------------------------------------------

/// Label synonyms per note kind, lowercase. Longer synonyms first where
/// one is a prefix of another.
const NOTE_LABELS: &[(NoteKind, &[&str])] = &[
    (NoteKind::Important, &["важно!", "важно", "important"]),
    (NoteKind::Warning, &["внимание", "warning"]),
    (NoteKind::Example, &["пример", "example"]),
    (NoteKind::Tip, &["совет", "tip"]),
    (NoteKind::Info, &["заметка", "note", "инфо", "info"]),
];

/// Match a note label at the start of the first quoted line.
///
/// Accepts `Label`, `Label:`, `**Label**:` and `**Label:**` (any case,
/// `__` for `**` too). Returns the kind and the text after the label.
pub fn match_note_label(line: &str) -> Option<(NoteKind, &str)> {
    let (bold, s) = match strip_bold(line) {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let s = s.trim_start();

    for (note, synonyms) in NOTE_LABELS {
        for synonym in *synonyms {
            let Some(len) = prefix_len_ignore_case(s, synonym) else {
                continue;
            };
            let rest = &s[len..];
            if rest.starts_with(char::is_alphanumeric) {
                continue;
            }
            return Some((*note, strip_label_tail(rest, bold)));
        }
    }
    None
}

fn strip_bold(s: &str) -> Option<&str> {
    s.strip_prefix("**").or_else(|| s.strip_prefix("__"))
}

/// After the label: an optional colon and, if the label opened bold, an
/// optional closing `**`/`__`, in either order.
fn strip_label_tail(rest: &str, bold: bool) -> &str {
    let mut s = rest.trim_start();
    let mut colon = false;
    let mut closed = !bold;
    loop {
        if !colon {
            if let Some(r) = s.strip_prefix(':') {
                s = r.trim_start();
                colon = true;
                continue;
            }
        }
        if !closed {
            if let Some(r) = strip_bold(s) {
                s = r.trim_start();
                closed = true;
                continue;
            }
        }
        return s;
    }
}

/// Byte length of the prefix of `s` that equals `lower` case-insensitively.
fn prefix_len_ignore_case(s: &str, lower: &str) -> Option<usize> {
    let mut len = 0;
    let mut chars = s.chars();
    for expected in lower.chars() {
        let c = chars.next()?;
        let mut folded = c.to_lowercase();
        if folded.next() != Some(expected) || folded.next().is_some() {
            return None;
        }
        len += c.len_utf8();
    }
    Some(len)
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A post after its metadata header has been split off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Parsed front matter (empty when the source has no header).
    pub metadata: Metadata,
    /// Markdown body that follows the header.
    pub body: String,
}

impl Document {
    /// Split `raw` into front matter and body.
    pub fn parse(raw: &str) -> Self {
        let (metadata, body) = crate::front_matter::parse_front_matter(raw);
        Self { metadata, body }
    }

    /// Render the body as an HTML fragment.
    pub fn to_html(&self) -> String {
        crate::render_html::render_markdown(&self.body)
    }
}

/// Front matter fields in key order.
///
/// Well-known keys have typed accessors; every other key is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: BTreeMap<String, MetaValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetaValue)> {
        self.fields.iter()
    }

    /// String value of `key`, if it holds one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(MetaValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    pub fn date(&self) -> Option<&str> {
        self.get_str("date")
    }

    /// Cover image URL.
    pub fn cover(&self) -> Option<&str> {
        self.get_str("cover")
    }

    /// Tags in source order; empty when `tags` is missing or not a list.
    pub fn tags(&self) -> &[String] {
        match self.fields.get("tags") {
            Some(MetaValue::List(items)) => items,
            _ => &[],
        }
    }
}

/// A single front matter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<String>),
}

/// Which pipeline a source document goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Markdown with an optional front matter header.
    Markdown,
    /// HTML exported from a word processor.
    Html,
}

impl SourceKind {
    /// Guess the kind from a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

/// A block-level element of a Markdown body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Rule,
    Quote {
        children: Vec<Block>,
    },
    Note {
        note: NoteKind,
        children: Vec<Block>,
    },
    List(List),
    Table(Table),
    FencedCode {
        #[serde(skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        content: String,
    },
    IndentedCode {
        content: String,
    },
    Paragraph {
        lines: Vec<String>,
    },
    Blank,
}

/// An ordered or unordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub ordered: bool,
    /// First explicit number of an ordered list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    pub items: Vec<ListItem>,
}

impl List {
    /// The `start` attribute to emit, if numbering does not begin at 1.
    pub fn start_attr(&self) -> Option<u64> {
        match self.start {
            Some(n) if self.ordered && n != 1 => Some(n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    /// Explicit number for an item that breaks the +1 sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskState>,
    pub text: String,
}

/// Checkbox state of a task list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Checked,
    Unchecked,
}

/// A pipe table. `alignments` always has one entry per header cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub header: Vec<String>,
    pub alignments: Vec<Alignment>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Alignment of column `idx`, left when the column has none.
    pub fn alignment(&self, idx: usize) -> Alignment {
        self.alignments.get(idx).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

/// Category of a callout note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Important,
    Warning,
    Example,
    Tip,
    Info,
}

impl NoteKind {
    /// CSS class suffix used on the note container.
    pub fn class(self) -> &'static str {
        match self {
            NoteKind::Important => "important",
            NoteKind::Warning => "warning",
            NoteKind::Example => "example",
            NoteKind::Tip => "tip",
            NoteKind::Info => "info",
        }
    }

    /// Label printed at the top of the note.
    pub fn title(self) -> &'static str {
        match self {
            NoteKind::Important => "Важно",
            NoteKind::Warning => "Внимание",
            NoteKind::Example => "Пример",
            NoteKind::Tip => "Совет",
            NoteKind::Info => "Заметка",
        }
    }
}

/// Limits applied at the rendering boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Deepest quote/note nesting that is parsed as Markdown.
    pub max_nesting: usize,
    /// Reject inputs larger than this many bytes.
    pub max_input_bytes: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_nesting: 16,
            max_input_bytes: None,
        }
    }
}

/// Output of [`crate::render_document`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub metadata: Metadata,
    pub html: String,
}

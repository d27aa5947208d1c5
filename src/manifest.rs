//! Post manifest: the list of posts a blog directory publishes.
//!
//! A manifest is a JSON array of records:
//!
//! ```json
//! [{ "slug": "hello", "title": "Hello", "date": "2025-03-01", "md": "hello.md" }]
//! ```
//!
//! Without a manifest, every `.md`/`.html` file under the directory becomes a
//! record keyed by its file stem. The output directory is never scanned, even
//! when it lives inside the post directory.

use anyhow::{Context, Result};
use postdoc::{Metadata, SourceKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One entry of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Markdown source, relative to the manifest directory or a URL.
    #[serde(default)]
    pub md: Option<String>,
    /// Word-processor HTML source, used when there is no `md`.
    #[serde(default)]
    pub html: Option<String>,
}

impl PostRecord {
    /// Source path and kind. Markdown wins when both are set.
    pub fn source(&self) -> Option<(&str, SourceKind)> {
        self.md
            .as_deref()
            .map(|p| (p, SourceKind::Markdown))
            .or_else(|| self.html.as_deref().map(|p| (p, SourceKind::Html)))
    }

    /// Slugs become file names, so they must be a single path segment.
    pub fn has_safe_slug(&self) -> bool {
        !self.slug.is_empty()
            && self.slug != "."
            && self.slug != ".."
            && !self.slug.contains(['/', '\\'])
    }
}

/// True for `http://` and `https://` sources, which are never fetched.
pub fn is_remote(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Post description written next to each rendered fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub cover: String,
    pub tags: Vec<String>,
    pub kind: SourceKind,
    pub source: String,
    /// Every front matter field, including the ones above.
    pub metadata: Metadata,
}

/// Merge a record with the front matter of its source. Front matter wins.
pub fn summarize(record: &PostRecord, metadata: &Metadata, kind: SourceKind, source: &str) -> PostSummary {
    let pick = |from_meta: Option<&str>, from_record: &Option<String>| {
        from_meta
            .or(from_record.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let tags = match metadata.get("tags") {
        Some(postdoc::MetaValue::List(items)) => items.clone(),
        _ => record.tags.clone(),
    };

    PostSummary {
        slug: record.slug.clone(),
        title: pick(metadata.title(), &record.title),
        description: pick(metadata.description(), &record.description),
        date: pick(metadata.date(), &record.date),
        cover: pick(metadata.cover(), &record.cover),
        tags,
        kind,
        source: source.to_string(),
        metadata: metadata.clone(),
    }
}

/// Load a manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<PostRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<PostRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), posts = records.len(), "loaded manifest");
    Ok(records)
}

/// Build records for every post file under `dir`, sorted by path.
///
/// The `exclude` directory (the batch output) is pruned from the walk.
pub fn discover(dir: &Path, exclude: Option<&Path>) -> Result<Vec<PostRecord>> {
    let excluded = exclude.and_then(|p| std::fs::canonicalize(p).ok());
    let mut records = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| match &excluded {
            Some(skip) if e.file_type().is_dir() => {
                std::fs::canonicalize(e.path()).ok().as_ref() != Some(skip)
            }
            _ => true,
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(kind) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SourceKind::from_extension)
        else {
            continue;
        };
        let Some(slug) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };

        let rel: PathBuf = path.strip_prefix(dir).unwrap_or(path).to_path_buf();
        let rel = rel.to_string_lossy().replace('\\', "/");
        let mut record = PostRecord {
            slug,
            ..PostRecord::default()
        };
        match kind {
            SourceKind::Markdown => record.md = Some(rel),
            SourceKind::Html => record.html = Some(rel),
        }
        records.push(record);
    }

    tracing::debug!(dir = %dir.display(), posts = records.len(), "discovered posts");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use postdoc::MetaValue;

    #[test]
    fn test_parse_manifest_records() {
        let json = r#"[
            { "slug": "a", "title": "A", "tags": ["x"], "md": "a.md" },
            { "slug": "b", "html": "b.html", "cover": "/b.png" }
        ]"#;
        let records: Vec<PostRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source(), Some(("a.md", SourceKind::Markdown)));
        assert_eq!(records[1].source(), Some(("b.html", SourceKind::Html)));
        assert_eq!(records[1].cover.as_deref(), Some("/b.png"));
        assert!(records[1].tags.is_empty());
    }

    #[test]
    fn test_markdown_source_wins() {
        let record = PostRecord {
            slug: "x".into(),
            md: Some("x.md".into()),
            html: Some("x.html".into()),
            ..PostRecord::default()
        };
        assert_eq!(record.source(), Some(("x.md", SourceKind::Markdown)));
    }

    #[test]
    fn test_front_matter_overrides_record() {
        let record = PostRecord {
            slug: "p".into(),
            title: Some("From manifest".into()),
            description: Some(" Kept ".into()),
            tags: vec!["manifest".into()],
            ..PostRecord::default()
        };
        let mut meta = Metadata::new();
        meta.insert("title", MetaValue::String("From header".into()));
        meta.insert("tags", MetaValue::List(vec!["header".into()]));

        let summary = summarize(&record, &meta, SourceKind::Markdown, "p.md");
        assert_eq!(summary.title, "From header");
        assert_eq!(summary.description, "Kept");
        assert_eq!(summary.date, "");
        assert_eq!(summary.tags, vec!["header".to_string()]);
    }

    #[test]
    fn test_record_tags_used_without_header_tags() {
        let record = PostRecord {
            slug: "p".into(),
            tags: vec!["manifest".into()],
            ..PostRecord::default()
        };
        let summary = summarize(&record, &Metadata::new(), SourceKind::Html, "p.html");
        assert_eq!(summary.tags, vec!["manifest".to_string()]);
    }

    #[test]
    fn test_slug_safety() {
        let mut record = PostRecord::default();
        assert!(!record.has_safe_slug());
        record.slug = "../etc".into();
        assert!(!record.has_safe_slug());
        record.slug = "ok-slug".into();
        assert!(record.has_safe_slug());
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/a.md"));
        assert!(is_remote("HTTP://x"));
        assert!(!is_remote("posts/a.md"));
    }

    #[test]
    fn test_discover_finds_post_files() {
        let dir = std::env::temp_dir().join("postdoc-test-discover");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("b.md"), "# B").unwrap();
        std::fs::write(dir.join("nested/a.html"), "<p>A</p>").unwrap();
        std::fs::write(dir.join("notes.txt"), "skip").unwrap();

        let records = discover(&dir, None).unwrap();
        let slugs: Vec<_> = records.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "a"]);
        assert_eq!(records[1].html.as_deref(), Some("nested/a.html"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_discover_skips_excluded_dir() {
        let dir = std::env::temp_dir().join("postdoc-test-discover-exclude");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("out")).unwrap();
        std::fs::create_dir_all(dir.join("drafts")).unwrap();
        std::fs::write(dir.join("a.md"), "# A").unwrap();
        std::fs::write(dir.join("drafts/b.md"), "# B").unwrap();
        std::fs::write(dir.join("out/a.html"), "<h1>A</h1>").unwrap();

        let records = discover(&dir, Some(&dir.join("out"))).unwrap();
        let sources: Vec<_> = records.iter().filter_map(|r| r.md.as_deref()).collect();
        assert_eq!(sources, vec!["a.md", "drafts/b.md"]);
        assert!(records.iter().all(|r| r.html.is_none()));

        // A missing output directory excludes nothing.
        let records = discover(&dir, Some(&dir.join("nowhere"))).unwrap();
        assert_eq!(records.len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }
}

//! `postdoc batch`: render every post of a blog directory into fragments.
//!
//! Each post produces `<slug>.html` (the fragment) and `<slug>.json` (the
//! merged record). Outputs whose content hash already matches are left alone.

use anyhow::{Context, Result};
use colored::Colorize;
use postdoc::RenderOptions;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::{self, PostRecord};

/// Options passed from CLI to the batch pipeline.
pub struct BatchOpts {
    pub dir: PathBuf,
    pub out_dir: PathBuf,
    pub manifest: String,
    pub render: RenderOptions,
    pub dry_run: bool,
    pub force: bool,
    pub quiet: bool,
}

/// Aggregate report from a batch run, counted per post.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

impl BatchReport {
    pub fn print_summary(&self) {
        println!();
        println!("{}", "========================================".dimmed());
        println!("{}", "Batch complete!".green().bold());
        println!();

        let mut parts = Vec::new();
        if self.written > 0 {
            parts.push(format!("{} written", self.written));
        }
        if self.unchanged > 0 {
            parts.push(format!("{} unchanged", self.unchanged));
        }
        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped));
        }

        if parts.is_empty() {
            println!("No posts found.");
        } else {
            println!("Posts: {}", parts.join(", "));
        }

        for w in &self.warnings {
            println!("{} {}", "WARNING:".yellow(), w);
        }
    }
}

/// Result status for a single output file.
#[derive(Debug, PartialEq)]
enum FileStatus {
    New,
    Updated,
    Unchanged,
}

/// Run the batch pipeline.
pub fn run_batch(opts: &BatchOpts) -> Result<BatchReport> {
    let manifest_path = opts.dir.join(&opts.manifest);
    let records = if manifest_path.exists() {
        manifest::load_manifest(&manifest_path)?
    } else {
        tracing::info!(
            manifest = %manifest_path.display(),
            "no manifest found, rendering every post file"
        );
        manifest::discover(&opts.dir, Some(&opts.out_dir))?
    };

    if !opts.quiet {
        println!(
            "{} {} {}",
            "Postdoc Batch".bold(),
            format!("{} post(s)", records.len()).dimmed(),
            format!("- {} -> {}", opts.dir.display(), opts.out_dir.display()).dimmed()
        );
        if opts.dry_run {
            println!("{}", "[DRY RUN] No files will be written.".yellow());
        }
    }

    let mut report = BatchReport::default();
    let mut seen = HashSet::new();
    for record in &records {
        if !seen.insert(record.slug.as_str()) {
            // The first record with a slug owns <slug>.html.
            skip(
                &mut report,
                opts,
                format!("Post '{}' duplicates an earlier slug; skipped", record.slug),
            );
            continue;
        }
        process_record(record, opts, &mut report)?;
    }

    Ok(report)
}

fn process_record(record: &PostRecord, opts: &BatchOpts, report: &mut BatchReport) -> Result<()> {
    if !record.has_safe_slug() {
        skip(report, opts, format!("Post '{}' has an unusable slug", record.slug));
        return Ok(());
    }
    let Some((source, kind)) = record.source() else {
        skip(report, opts, format!("Post '{}' has no md or html source", record.slug));
        return Ok(());
    };
    if manifest::is_remote(source) {
        skip(report, opts, format!("Post '{}' has a remote source ({source}), not fetched", record.slug));
        return Ok(());
    }

    let source_path = opts.dir.join(source);
    if !source_path.exists() {
        skip(
            report,
            opts,
            format!("Post '{}': {} not found", record.slug, source_path.display()),
        );
        return Ok(());
    }

    let raw = fs::read_to_string(&source_path)
        .with_context(|| format!("Failed to read {}", source_path.display()))?;
    let doc = postdoc::render_document(&raw, kind, &opts.render)
        .with_context(|| format!("Failed to render {}", source_path.display()))?;

    let summary = manifest::summarize(record, &doc.metadata, kind, source);
    let mut json = serde_json::to_string_pretty(&summary)
        .with_context(|| format!("Failed to serialize record for '{}'", record.slug))?;
    json.push('\n');

    let html_path = opts.out_dir.join(format!("{}.html", record.slug));
    let json_path = opts.out_dir.join(format!("{}.json", record.slug));
    let html_status = write_output(&html_path, &doc.html, opts)?;
    let json_status = write_output(&json_path, &json, opts)?;

    if html_status == FileStatus::Unchanged && json_status == FileStatus::Unchanged {
        report.unchanged += 1;
        tracing::debug!(slug = %record.slug, "post unchanged");
        return Ok(());
    }

    report.written += 1;
    if !opts.quiet {
        let (mark, label) = if html_status == FileStatus::New {
            ("+".green(), "new")
        } else {
            ("~".yellow(), "updated")
        };
        println!("  {} {} ({label}) -> {}", mark, record.slug, html_path.display());
    }
    Ok(())
}

fn skip(report: &mut BatchReport, opts: &BatchOpts, message: String) {
    if !opts.quiet {
        println!("  {} {}", "!".yellow(), message);
    }
    tracing::warn!("{message}");
    report.skipped += 1;
    report.warnings.push(message);
}

/// Write `contents` to `path` unless the file already holds exactly that.
fn write_output(path: &Path, contents: &str, opts: &BatchOpts) -> Result<FileStatus> {
    let status = if !path.exists() {
        FileStatus::New
    } else if !opts.force && file_hash(path)? == content_hash(contents.as_bytes()) {
        return Ok(FileStatus::Unchanged);
    } else {
        FileStatus::Updated
    };

    if !opts.dry_run {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(status)
}

/// Compute SHA-256 hash of file contents.
fn file_hash(path: &Path) -> Result<String> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content_hash(&content))
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

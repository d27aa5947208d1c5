//! `postdoc render`, `meta` and `check`: single-file commands.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use notify::{EventKind, RecursiveMode, Watcher};
use postdoc::{Diagnostic, RenderOptions, Severity, SourceKind};
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// How `render` decides between the Markdown and HTML pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    /// From the file extension; unknown extensions are Markdown.
    Auto,
    Markdown,
    Html,
}

impl KindArg {
    pub fn resolve(self, file: &Path) -> SourceKind {
        match self {
            KindArg::Markdown => SourceKind::Markdown,
            KindArg::Html => SourceKind::Html,
            KindArg::Auto => file
                .extension()
                .and_then(|e| e.to_str())
                .and_then(SourceKind::from_extension)
                .unwrap_or(SourceKind::Markdown),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// The HTML fragment only.
    Html,
    /// `{ metadata, html }`
    Json,
    /// `{ metadata, blocks }`, Markdown sources only.
    Ast,
}

fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read '{}'", file.display()))
}

fn print_header_diagnostics(file: &Path, raw: &str) {
    let result = postdoc::parse_front_matter_with_diagnostics(raw);
    for diag in &result.diagnostics {
        eprintln!("{}: {}", line_info(file, diag), diag.message);
    }
}

fn line_info(file: &Path, diag: &Diagnostic) -> String {
    match diag.line {
        Some(line) => format!("{}:{}", file.display(), line),
        None => file.display().to_string(),
    }
}

pub fn handle_render(
    file: &Path,
    kind: KindArg,
    format: OutputFormat,
    options: &RenderOptions,
) -> Result<()> {
    let raw = read_source(file)?;
    let kind = kind.resolve(file);
    tracing::debug!(file = %file.display(), ?kind, ?format, "rendering");

    if kind == SourceKind::Markdown {
        print_header_diagnostics(file, &raw);
    }

    let output = match format {
        OutputFormat::Ast => {
            if kind == SourceKind::Html {
                bail!("'{}' is an HTML source; --format ast needs Markdown", file.display());
            }
            if let Some(limit) = options.max_input_bytes {
                if raw.len() > limit {
                    bail!(postdoc::RenderError::InputTooLarge { size: raw.len(), limit });
                }
            }
            let (metadata, blocks) = postdoc::parse_document(&raw, options);
            serde_json::to_string_pretty(&serde_json::json!({
                "metadata": metadata,
                "blocks": blocks,
            }))?
        }
        OutputFormat::Html | OutputFormat::Json => {
            let doc = postdoc::render_document(&raw, kind, options)
                .with_context(|| format!("Failed to render '{}'", file.display()))?;
            if format == OutputFormat::Html {
                doc.html
            } else {
                serde_json::to_string_pretty(&doc)?
            }
        }
    };

    println!("{output}");
    Ok(())
}

pub fn handle_meta(file: &Path) -> Result<()> {
    let raw = read_source(file)?;
    let (metadata, _) = postdoc::parse_front_matter(&raw);
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

/// Diagnostics for one file: front matter findings plus the size limit.
pub fn check_source(raw: &str, options: &RenderOptions) -> Vec<Diagnostic> {
    let mut diagnostics = postdoc::parse_front_matter_with_diagnostics(raw).diagnostics;
    if let Some(limit) = options.max_input_bytes {
        if raw.len() > limit {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                message: postdoc::RenderError::InputTooLarge { size: raw.len(), limit }.to_string(),
                line: None,
                code: Some("E201".into()),
            });
        }
    }
    diagnostics
}

pub fn handle_check(files: &[String], options: &RenderOptions) -> Result<()> {
    let mut has_errors = false;

    for file in files {
        let path = Path::new(file);
        let raw = read_source(path)?;
        let diagnostics = check_source(&raw, options);

        if diagnostics.is_empty() {
            println!("{}: {}", file, "OK".green());
            continue;
        }

        for diag in &diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => {
                    has_errors = true;
                    format!("{}", "error".red().bold())
                }
                Severity::Warning => format!("{}", "warning".yellow().bold()),
            };
            let code_str = match &diag.code {
                Some(c) => format!("[{c}] "),
                None => String::new(),
            };
            println!("{}: {severity_str}: {code_str}{}", line_info(path, diag), diag.message);
        }
    }

    if has_errors {
        std::process::exit(1);
    }

    Ok(())
}

/// Re-render `file` every time it is saved, until the watcher goes away.
pub fn watch_and_render(
    file: &Path,
    kind: KindArg,
    format: OutputFormat,
    options: &RenderOptions,
) -> Result<()> {
    let file_path = std::fs::canonicalize(file)
        .with_context(|| format!("Cannot resolve path '{}'", file.display()))?;
    let watch_dir = file_path
        .parent()
        .with_context(|| format!("Cannot determine parent directory of '{}'", file.display()))?;

    if let Err(e) = handle_render(file, kind, format, options) {
        eprintln!("{} {:#}", "Render error:".red().bold(), e);
    }

    eprintln!(
        "{} {} for changes (Ctrl+C to stop)",
        "Watching".cyan().bold(),
        file.display()
    );

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;
    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

    let mut last_render = Instant::now();
    let debounce = Duration::from_millis(200);

    loop {
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(event) => {
                let is_write = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
                let affects_file = event
                    .paths
                    .iter()
                    .any(|p| p.canonicalize().ok().as_ref() == Some(&file_path));

                if is_write && affects_file && last_render.elapsed() > debounce {
                    // Let the editor finish writing.
                    std::thread::sleep(Duration::from_millis(50));

                    match handle_render(file, kind, format, options) {
                        Ok(()) => last_render = Instant::now(),
                        Err(e) => eprintln!("{} {:#}", "Render error:".red().bold(), e),
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(KindArg::Auto.resolve(Path::new("a/post.md")), SourceKind::Markdown);
        assert_eq!(KindArg::Auto.resolve(Path::new("export.HTML")), SourceKind::Html);
        assert_eq!(KindArg::Auto.resolve(Path::new("README")), SourceKind::Markdown);
        assert_eq!(KindArg::Html.resolve(Path::new("post.md")), SourceKind::Html);
    }

    #[test]
    fn test_check_clean_source() {
        let diags = check_source("---\ntitle: Fine\n---\nBody", &RenderOptions::default());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_check_reports_header_warnings() {
        let diags = check_source("---\ntitle: x\nnot a pair\n---\n", &RenderOptions::default());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].code.as_deref(), Some("W101"));
        assert_eq!(diags[0].line, Some(3));
    }

    #[test]
    fn test_check_size_limit_is_an_error() {
        let options = RenderOptions {
            max_input_bytes: Some(4),
            ..RenderOptions::default()
        };
        let diags = check_source("too long", &options);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].code.as_deref(), Some("E201"));
    }
}

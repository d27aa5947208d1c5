use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod batch;
mod config;
mod manifest;
mod render;

#[derive(Parser)]
#[command(
    name = "postdoc",
    version,
    about = "Render Markdown and word-processor HTML posts into clean HTML fragments"
)]
struct Cli {
    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log debug details to stderr
    #[arg(long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Config file (default: ./postdoc.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one post to stdout
    Render {
        /// Path to the .md or .html file
        file: PathBuf,

        /// Source pipeline
        #[arg(long, value_enum, default_value = "auto")]
        kind: render::KindArg,

        /// Output format
        #[arg(long, value_enum, default_value = "html")]
        format: render::OutputFormat,

        /// Re-render whenever the file is saved
        #[arg(long)]
        watch: bool,
    },

    /// Print a post's front matter as JSON
    Meta {
        /// Path to the .md file
        file: PathBuf,
    },

    /// Check front matter of post file(s)
    Check {
        /// Path to the .md file(s)
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Render every post of a directory into fragments
    Batch {
        /// Directory holding the posts (and optionally a manifest)
        dir: PathBuf,

        /// Output directory (default: outDir from the config)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Rewrite outputs even when unchanged
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if quiet {
            "warn"
        } else if verbose {
            "debug"
        } else {
            "info"
        };
        EnvFilter::new(level)
    });

    // stdout carries rendered output; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            file,
            kind,
            format,
            watch,
        } => {
            if watch {
                render::watch_and_render(&file, kind, format, &config.render)?;
            } else {
                render::handle_render(&file, kind, format, &config.render)?;
            }
        }
        Commands::Meta { file } => {
            render::handle_meta(&file)?;
        }
        Commands::Check { files } => {
            render::handle_check(&files, &config.render)?;
        }
        Commands::Batch {
            dir,
            out,
            dry_run,
            force,
        } => {
            let opts = batch::BatchOpts {
                dir,
                out_dir: out.unwrap_or(config.out_dir),
                manifest: config.manifest,
                render: config.render,
                dry_run,
                force,
                quiet: cli.quiet,
            };
            let report = batch::run_batch(&opts)?;
            if !cli.quiet {
                report.print_summary();
            }
        }
    }

    Ok(())
}

//! # fileindex CLI (`fidx`)
//!
//! The `fidx` binary indexes local files into a SQLite FTS5 index and
//! searches it.
//!
//! ## Usage
//!
//! ```bash
//! fidx --config ./config/fidx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fidx init` | Create the index database and schema |
//! | `fidx index <paths>...` | Index files and directories |
//! | `fidx query <terms>...` | Search the index |
//! | `fidx stats` | Show index statistics |
//! | `fidx serve` | Start the HTTP search API |
//! | `fidx completions <shell>` | Print a shell completion script |
//!
//! ## Examples
//!
//! ```bash
//! # Index a documents folder, mapping .note files to plain text
//! fidx index ~/Documents --mime note=text/plain
//!
//! # Reindex everything regardless of the size limit
//! fidx index ~/Documents --force
//!
//! # Second page of results without ANSI highlighting
//! fidx query kubernetes --from 10 --no-highlight
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fileindex::config::{load_config, Overrides};
use fileindex::progress::ProgressMode;
use fileindex::store::{IndexSink, SqliteSink};
use fileindex::{ingest, search, server, stats};

/// fidx: incremental full-text indexing of local files.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "fidx",
    about = "Incremental full-text indexing of local files",
    version,
    long_about = "fidx converts text files, PDFs (with OCR fallback for scans), images \
    and audio tags into searchable documents, reprocessing only files whose content \
    changed since the last run."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/fidx.toml`. Storage locations, size limits,
    /// OCR settings and query defaults are read from this file.
    #[arg(long, global = true, default_value = "./config/fidx.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the index database.
    ///
    /// Creates the SQLite database file and its FTS5 table. This command is
    /// idempotent; running it multiple times is safe.
    Init,

    /// Index files and directories.
    ///
    /// Directories are walked recursively; hidden entries and the index's
    /// own storage are skipped. Files whose content is unchanged since the
    /// last run are not reprocessed.
    Index {
        /// Files or directories to index.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Ignore the maximum file size. Unchanged files are still skipped.
        #[arg(long)]
        force: bool,

        /// Maximum file size in bytes.
        #[arg(long)]
        max_file_size: Option<u64>,

        /// Custom extension mapping as `ext=type/subtype` (repeatable).
        #[arg(long = "mime", value_parser = parse_key_val)]
        mime: Vec<(String, String)>,

        /// Progress on stderr: `off`, `human` or `json`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long, value_parser = ["off", "human", "json"])]
        progress: Option<String>,
    },

    /// Search the index.
    ///
    /// Terms are joined with spaces into one free-text query. Results are
    /// ranked and printed with highlighted fragments.
    Query {
        /// Search terms.
        #[arg(required = true)]
        terms: Vec<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<i64>,

        /// Number of results to skip.
        #[arg(long)]
        from: Option<i64>,

        /// Print fragments without highlighting.
        #[arg(long)]
        no_highlight: bool,
    },

    /// Show index statistics.
    Stats,

    /// Start the HTTP search API.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,

    /// Print a shell completion script to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fidx={level},fileindex={level},warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "fidx", &mut std::io::stdout());
        return Ok(());
    }

    let mut overrides = Overrides::default();
    match &cli.command {
        Commands::Index {
            force,
            max_file_size,
            mime,
            ..
        } => {
            overrides.force = *force;
            overrides.max_file_size = *max_file_size;
            overrides.mime = mime.clone();
        }
        Commands::Query {
            limit,
            from,
            no_highlight,
            ..
        } => {
            overrides.limit = *limit;
            overrides.from = *from;
            overrides.no_highlight = *no_highlight;
        }
        _ => {}
    }

    let cfg = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?
        .with_overrides(overrides)?;

    match cli.command {
        Commands::Init => {
            let sink = SqliteSink::open(&cfg.storage.index_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to create index at {}",
                        cfg.storage.index_path.display()
                    )
                })?;
            sink.close().await?;
            println!("Index initialized successfully.");
        }
        Commands::Index {
            paths, progress, ..
        } => {
            let mode = match progress.as_deref() {
                Some("off") => ProgressMode::Off,
                Some("human") => ProgressMode::Human,
                Some("json") => ProgressMode::Json,
                _ => ProgressMode::default_for_tty(),
            };
            ingest::run_index(&cfg, &paths, mode).await?;
        }
        Commands::Query { terms, .. } => {
            search::run_query(&cfg, &terms).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

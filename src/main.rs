//! # mdpack CLI
//!
//! Synchronizes a tree of markdown documents with YAML frontmatter into a
//! mirrored tree of JSON artifacts, plus an optional aggregate `index.json`.
//!
//! ## Usage
//!
//! ```bash
//! mdpack sync <SOURCE> --output <DIR> [--index <DIR>] [--changed-since YYYY-MM-DD]
//! ```
//!
//! Runs are incremental and idempotent: unchanged documents produce zero
//! destination writes, removed documents have their artifacts swept, and
//! the aggregate index is only rewritten when its bytes would change.
//! Ctrl-C requests a cooperative stop; in-flight file operations finish and
//! the run reports `cancelled` instead of `ok`.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mdpack::config::{self, Config};
use mdpack::sync;

/// mdpack — incremental markdown-to-JSON artifact synchronizer.
#[derive(Parser)]
#[command(
    name = "mdpack",
    about = "Incremental markdown-to-JSON artifact synchronizer",
    version,
    long_about = "mdpack converts markdown documents with YAML frontmatter into JSON \
    artifacts, one per document, keeping a destination tree and an optional aggregate \
    index synchronized with the source tree across runs without any persisted state."
)]
struct Cli {
    /// Path to an optional TOML configuration file (retry policy, worker
    /// pool size, file extensions). Built-in defaults are used without it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (debug level). `RUST_LOG` overrides this.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize a source tree (or single document) into the output tree.
    ///
    /// Detects added, changed, and removed documents since the last run by
    /// comparing the two trees, converts what changed, sweeps artifacts
    /// whose document is gone, and optionally rebuilds the aggregate index.
    Sync {
        /// Source document or directory of documents.
        source: PathBuf,

        /// Destination directory for artifacts (created when missing).
        #[arg(long)]
        output: PathBuf,

        /// Directory for the aggregate index artifact. Omit to skip the
        /// index rebuild.
        #[arg(long)]
        index: Option<PathBuf>,

        /// Only reprocess already-converted documents modified on or after
        /// this date (YYYY-MM-DD). New and removed documents are always
        /// handled.
        #[arg(long)]
        changed_since: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    // Ctrl-C requests a cooperative stop; workers observe the token at each
    // iteration and before each retry.
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, stopping");
            signal_token.cancel();
        }
    });

    match cli.command {
        Commands::Sync {
            source,
            output,
            index,
            changed_since,
        } => {
            let changed_since = changed_since
                .map(|s| parse_date(&s))
                .transpose()?;
            sync::run_sync(
                &config,
                &source,
                &output,
                index.as_deref(),
                changed_since,
                &token,
            )
            .await?;
        }
    }

    Ok(())
}

fn parse_date(value: &str) -> Result<chrono::DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid --changed-since date: {value}"))?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

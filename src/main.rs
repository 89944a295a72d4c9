//! # crawlscope CLI
//!
//! ## Usage
//!
//! ```bash
//! crawlscope --config ./config/crawlscope.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `crawlscope search "<query>"` | Best matching sources with a preview each |
//! | `crawlscope ask "<question>"` | Answer from full pages, with sources |
//! | `crawlscope scope "<query>"` | Show the time scope a question implies |
//! | `crawlscope canonicalize <url>...` | Print the canonical form of URLs |
//!
//! Logs go to stderr. Set `RUST_LOG` (for example `RUST_LOG=crawlscope=debug`)
//! or pass `--verbose` to see pipeline details.

use clap::{Parser, Subcommand};
use crawlscope::ask::{self, AskOptions};
use crawlscope::config;
use crawlscope::inspect;
use crawlscope::search;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Search and question answering over a crawled web corpus.
///
/// `search` and `ask` read the TOML file given by `--config`; see
/// `config/crawlscope.example.toml`. `scope` and `canonicalize` work
/// offline and ignore it.
#[derive(Parser)]
#[command(name = "crawlscope", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/crawlscope.toml")]
    config: PathBuf,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the best matching sources for a query.
    ///
    /// Results are grouped by canonical URL; each shows the most readable,
    /// query-relevant excerpt among its chunks.
    Search {
        query: String,

        /// Distinct sources to show (default: retrieval.search_limit).
        #[arg(long)]
        limit: Option<usize>,

        /// Apply lexical reranking before grouping.
        #[arg(long)]
        rerank: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from full crawled pages.
    ///
    /// Time phrases such as "today" or "this week" restrict the answer to
    /// content from that window.
    Ask {
        question: String,

        /// Chunks kept after diversity selection.
        #[arg(long)]
        chunks: Option<usize>,

        /// Full documents fetched for context.
        #[arg(long)]
        documents: Option<usize>,

        /// Chunks allowed per source before others are considered.
        #[arg(long)]
        max_per_url: Option<usize>,

        /// Context budget in characters.
        #[arg(long)]
        max_context_chars: Option<usize>,

        /// Print the assembled context instead of calling the answer model.
        #[arg(long)]
        context_only: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show the time scope detected in a query.
    Scope { query: String },

    /// Print the canonical form of each URL.
    Canonicalize {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "crawlscope=debug,crawlscope_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        // Offline commands don't read the config.
        Commands::Scope { query } => inspect::run_scope(&query)?,
        Commands::Canonicalize { urls } => inspect::run_canonicalize(&urls)?,
        Commands::Search {
            query,
            limit,
            rerank,
            json,
        } => {
            let cfg = config::load_config(&cli.config)?;
            search::run_search(&cfg, &query, limit, rerank, json).await?;
        }
        Commands::Ask {
            question,
            chunks,
            documents,
            max_per_url,
            max_context_chars,
            context_only,
            json,
        } => {
            let cfg = config::load_config(&cli.config)?;
            let defaults = AskOptions::from_config(&cfg);
            let options = AskOptions {
                chunks: chunks.unwrap_or(defaults.chunks).max(1),
                documents: documents.unwrap_or(defaults.documents).max(1),
                max_per_url: max_per_url.unwrap_or(defaults.max_per_url).max(1),
                max_context_chars: max_context_chars.unwrap_or(defaults.max_context_chars),
                ..defaults
            };
            ask::run_ask(&cfg, &question, &options, context_only, json).await?;
        }
    }

    Ok(())
}

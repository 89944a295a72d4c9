//! # crawlscope
//!
//! Search and question answering over a crawled web corpus.
//!
//! Pages are crawled, chunked and embedded into a Qdrant collection by a
//! separate indexer. crawlscope is the read side: it embeds a query,
//! searches the collection, cleans up the noisy results, and either shows
//! the best sources or answers a question from full-page context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────────┐   ┌──────────┐
//! │ Embedder │──▶│  Qdrant  │──▶│ crawlscope-core │──▶│   CLI    │
//! │          │   │  search  │   │ rerank, scope,  │   │ search / │
//! └──────────┘   └──────────┘   │ dedupe, preview │   │   ask    │
//!                               └────────┬────────┘   └────▲─────┘
//!                                        ▼                 │
//!                                  ┌───────────┐     ┌─────┴────┐
//!                                  │  Scrape   │────▶│   LLM    │
//!                                  │ full docs │     │  answer  │
//!                                  └───────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! crawlscope search "hooks configuration" --rerank
//! crawlscope ask "what did I read about subagents today?"
//! crawlscope scope "changes this week"
//! crawlscope canonicalize "https://Docs.Example.com/guide/?utm_source=x#intro"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`traits`] | Seams for the embedder, vector index, fetcher and answerer |
//! | [`embedding`] | Query embedding providers |
//! | [`vector`] | Qdrant search client |
//! | [`scrape`] | Full-document retrieval with bounded concurrency |
//! | [`llm`] | Chat-completions answerer |
//! | [`search`] | The `search` command |
//! | [`ask`] | The `ask` command |
//! | [`inspect`] | Offline `scope` and `canonicalize` commands |

pub mod ask;
pub mod config;
pub mod embedding;
pub mod inspect;
pub mod llm;
pub mod scrape;
pub mod search;
pub mod traits;
pub mod vector;

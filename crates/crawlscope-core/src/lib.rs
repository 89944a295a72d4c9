//! # crawlscope core
//!
//! The retrieval ranking and context-assembly pipeline shared by the
//! `search` and `ask` commands.
//!
//! Everything in this crate is synchronous and pure: no tokio, no HTTP,
//! no filesystem access. The application crate embeds queries, talks to
//! the vector store and the scrape API, and hands the results to the
//! functions here.
//!
//! ```text
//!  vector hits ──▶ canonical ──▶ rerank ──▶ temporal ──▶ select ──▶ context
//!                      │                                   │
//!                      └──────▶ preview (search output) ◀──┘
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Scored matches, payload mapping, shared result types |
//! | [`lexicon`] | Stop words and URL path patterns |
//! | [`canonical`] | URL canonicalization and grouping |
//! | [`rerank`] | Query tokenization and lexical score adjustments |
//! | [`snippet`] | Boilerplate cleaning, sentence splitting, previews |
//! | [`preview`] | Best chunk per source |
//! | [`select`] | Top-N URL deduplication and diversity selection |
//! | [`temporal`] | Natural-language time scopes |
//! | [`context`] | Character-budgeted prompt assembly |

pub mod canonical;
pub mod context;
pub mod lexicon;
pub mod models;
pub mod preview;
pub mod rerank;
pub mod select;
pub mod snippet;
pub mod temporal;

//! Collaborator seams for the search and ask pipelines.
//!
//! The pipelines in [`search`](crate::search) and [`ask`](crate::ask) only
//! talk to the outside world through these traits. The binary wires in the
//! HTTP clients; tests wire in in-memory fakes.
//!
//! ```text
//!  QueryEmbedder ──▶ VectorIndex ──▶ (core ranking) ──▶ DocumentFetcher ──▶ Answerer
//! ```
//!
//! # Example
//!
//! ```rust
//! use anyhow::Result;
//! use async_trait::async_trait;
//! use crawlscope::traits::QueryEmbedder;
//!
//! struct Constant;
//!
//! #[async_trait]
//! impl QueryEmbedder for Constant {
//!     async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
//!         Ok(vec![0.0; 4])
//!     }
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use crawlscope_core::context::RetrievedDocument;
use crawlscope_core::models::ScoredMatch;

/// Turns the user's query into a single vector.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Nearest-neighbour search over embedded chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `limit` hits, best first.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredMatch>>;
}

/// Retrieves a full page as Markdown.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RetrievedDocument>;
}

/// Writes an answer from a question and a packed context.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<String>;
}

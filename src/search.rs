//! The `search` command.
//!
//! embed → vector search → optional lexical rerank → top-N sources
//! (all their chunks) → group by canonical URL → best preview per group.

use anyhow::Result;
use crawlscope_core::canonical::group_by_canonical;
use crawlscope_core::lexicon::Lexicon;
use crawlscope_core::preview::select_best_preview;
use crawlscope_core::rerank::rerank_matches;
use crawlscope_core::select::dedupe_top_urls;
use crawlscope_core::snippet::PreviewParams;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::embedding::ConfiguredEmbedder;
use crate::traits::{QueryEmbedder, VectorIndex};
use crate::vector::QdrantIndex;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub candidate_limit: usize,
    /// Distinct sources to return.
    pub limit: usize,
    pub rerank: bool,
    pub preview: PreviewParams,
}

impl SearchOptions {
    pub fn from_config(config: &Config, limit: Option<usize>, rerank: bool) -> Self {
        Self {
            candidate_limit: config.retrieval.candidate_limit,
            limit: limit.unwrap_or(config.retrieval.search_limit).max(1),
            rerank: rerank || config.retrieval.rerank,
            preview: PreviewParams {
                max_chars: config.retrieval.preview_chars,
                ..PreviewParams::default()
            },
        }
    }
}

/// One source in the search output.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub canonical_url: String,
    pub url: String,
    pub title: String,
    /// Best vector score among the source's chunks.
    pub score: f64,
    /// Chunks of this source in the result set.
    pub chunks: usize,
    /// Index of the chunk the preview came from.
    pub chunk_index: u32,
    pub section_header: Option<String>,
    pub preview: String,
}

/// Run the search pipeline against the given collaborators.
pub async fn search_sources(
    embedder: &dyn QueryEmbedder,
    index: &dyn VectorIndex,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchHit>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let vector = embedder.embed_query(query).await?;
    let mut matches = index.search(&vector, options.candidate_limit).await?;
    // The caller bounds the pool before it reaches the core.
    matches.truncate(options.candidate_limit);
    debug!(candidates = matches.len(), "vector candidates");

    if options.rerank {
        matches = rerank_matches(matches, query, None);
    }

    let kept = dedupe_top_urls(&matches, options.limit);
    let lexicon = Lexicon::shared();
    let mut hits = Vec::new();

    for group in group_by_canonical(&kept) {
        let selection = select_best_preview(&group.matches, query, &options.preview, lexicon)?;
        let best = selection.best_candidate();
        debug!(
            url = %group.key,
            candidates = selection.candidates.len(),
            preview_score = best.preview_score,
            "preview selected"
        );

        let title = group
            .matches
            .iter()
            .map(|m| m.title.trim())
            .find(|t| !t.is_empty())
            .unwrap_or_default()
            .to_string();

        hits.push(SearchHit {
            rank: hits.len() + 1,
            canonical_url: group.key.clone(),
            url: best.item.url.clone(),
            title,
            score: group.best_score(),
            chunks: group.matches.len(),
            chunk_index: best.item.chunk_index,
            section_header: best.item.section_header.clone(),
            preview: best.preview.clone(),
        });
    }

    Ok(hits)
}

pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    rerank: bool,
    json: bool,
) -> Result<()> {
    let options = SearchOptions::from_config(config, limit, rerank);
    let embedder = ConfiguredEmbedder::new(&config.embedding)?;
    let index = QdrantIndex::new(&config.vector)?;

    let hits = search_sources(&embedder, &index, query, &options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for hit in &hits {
        let title = if hit.title.is_empty() {
            "(untitled)"
        } else {
            hit.title.as_str()
        };
        println!("{}. [{:.2}] {}", hit.rank, hit.score, title);
        println!("    url: {}", hit.canonical_url);
        if let Some(header) = &hit.section_header {
            println!("    section: {}", header);
        }
        println!("    chunks: {}", hit.chunks);
        if !hit.preview.is_empty() {
            println!("    preview: \"{}\"", hit.preview);
        }
        println!();
    }

    Ok(())
}

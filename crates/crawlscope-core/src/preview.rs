//! Pick the chunk that represents a source in search output.
//!
//! Each of a group's first [`PreviewParams::max_candidates`] chunks is
//! scored as `relevance_weight × relevance + richness`, where relevance
//! sums [`score_sentence`] over the chunk's relevant sentences and
//! richness rewards chunks with more (and longer) readable text:
//!
//! ```text
//! richness = 2 × min(sentences, 5) + min(cleaned_chars, 500) / 100
//! ```
//!
//! The highest preview score wins; an exact tie goes to the higher vector
//! score, then to the earlier chunk.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::lexicon::Lexicon;
use crate::models::ScoredMatch;
use crate::rerank::QueryTerms;
use crate::snippet::{extract_snippet, preview_for, score_sentence, PreviewParams};

pub const EMPTY_CANDIDATES: &str = "preview selection requires at least one candidate chunk";

/// One scored chunk of a group.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewCandidate<'a> {
    pub item: &'a ScoredMatch,
    /// Position within the group's chunk list.
    pub position: usize,
    pub preview_score: f64,
    pub relevance: u32,
    pub sentence_count: usize,
    pub cleaned_char_count: usize,
    /// The assembled preview text for this chunk.
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewSelection<'a> {
    /// Index into `candidates` of the winner.
    pub best: usize,
    pub candidates: Vec<PreviewCandidate<'a>>,
}

impl<'a> PreviewSelection<'a> {
    pub fn best_candidate(&self) -> &PreviewCandidate<'a> {
        &self.candidates[self.best]
    }

    pub fn best_match(&self) -> &'a ScoredMatch {
        self.candidates[self.best].item
    }
}

pub fn richness_score(sentence_count: usize, cleaned_chars: usize, params: &PreviewParams) -> f64 {
    let sentences = sentence_count.min(params.richness_sentence_cap) as f64;
    let chars = cleaned_chars.min(params.richness_char_cap) as f64;
    2.0 * sentences + chars / 100.0
}

/// Score one chunk for preview purposes.
pub fn score_candidate<'a>(
    item: &'a ScoredMatch,
    position: usize,
    query: &QueryTerms,
    params: &PreviewParams,
    lexicon: &Lexicon,
) -> PreviewCandidate<'a> {
    let snippet = extract_snippet(&item.chunk_text, lexicon, params);
    let relevance: u32 = snippet
        .sentences
        .iter()
        .map(|s| score_sentence(s, query))
        .sum();
    let sentence_count = snippet.sentences.len();
    let cleaned_char_count = snippet.cleaned_char_count();
    let preview_score = params.relevance_weight * relevance as f64
        + richness_score(sentence_count, cleaned_char_count, params);

    PreviewCandidate {
        item,
        position,
        preview_score,
        relevance,
        sentence_count,
        cleaned_char_count,
        preview: preview_for(&snippet, query, params),
    }
}

/// Choose the best preview chunk of a group.
///
/// Errors when `chunks` is empty; callers only pass non-empty groups.
pub fn select_best_preview<'a>(
    chunks: &[&'a ScoredMatch],
    query: &str,
    params: &PreviewParams,
    lexicon: &Lexicon,
) -> Result<PreviewSelection<'a>> {
    if chunks.is_empty() {
        bail!(EMPTY_CANDIDATES);
    }

    let terms = QueryTerms::new(query, lexicon);
    let candidates: Vec<PreviewCandidate<'a>> = chunks
        .iter()
        .take(params.max_candidates.max(1))
        .enumerate()
        .map(|(position, item)| score_candidate(item, position, &terms, params, lexicon))
        .collect();

    let mut best = 0;
    for (i, c) in candidates.iter().enumerate().skip(1) {
        let current = &candidates[best];
        let better = c.preview_score > current.preview_score
            || (c.preview_score == current.preview_score && c.item.score > current.item.score);
        if better {
            best = i;
        }
    }

    Ok(PreviewSelection { best, candidates })
}

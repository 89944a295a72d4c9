//! Core data types that flow through the ranking pipeline.
//!
//! A [`ScoredMatch`] is one chunk returned by the vector store. It is built
//! once from the store's payload by [`ScoredMatch::from_payload`] and never
//! mutated afterwards; every later stage borrows or clones it.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::canonical::canonicalize;
use crate::temporal::parse_timestamp_ms;

/// One retrieved chunk with its vector similarity score.
///
/// Invariant: `chunk_index < total_chunks` (enforced by
/// [`from_payload`](ScoredMatch::from_payload)).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMatch {
    /// Vector similarity. Usually in `[0, 1]` but not bounded.
    pub score: f64,
    pub url: String,
    /// Page title; empty when the payload has none.
    pub title: String,
    /// Heading of the section this chunk was cut from.
    pub section_header: Option<String>,
    /// Raw chunk text as stored (may contain Markdown and navigation).
    pub chunk_text: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub domain: String,
    /// Which ingestion command produced the chunk (`crawl`, `scrape`, ...).
    pub source_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_modified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path_rel: Option<String>,
}

impl ScoredMatch {
    /// Map a vector-store hit into a match.
    ///
    /// Absent or mistyped payload keys fall back to empty strings and zero;
    /// this never fails. Numeric fields accept integers, floats, and numeric
    /// strings. Provenance keys are read in both `snake_case` and
    /// `camelCase` spellings.
    pub fn from_payload(score: f64, payload: &Value) -> Self {
        // One below the maximum so `total_chunks` can always exceed it.
        let chunk_index = payload_u32(payload, &["chunk_index", "chunkIndex"])
            .unwrap_or(0)
            .min(u32::MAX - 1);
        let total_chunks = payload_u32(payload, &["total_chunks", "totalChunks"])
            .unwrap_or(1)
            .max(1)
            .max(chunk_index.saturating_add(1));

        Self {
            score: if score.is_finite() { score } else { 0.0 },
            url: payload_str(payload, &["url"]).unwrap_or_default(),
            title: payload_str(payload, &["title"]).unwrap_or_default(),
            section_header: payload_str(payload, &["chunk_header", "chunkHeader"])
                .filter(|h| !h.trim().is_empty()),
            chunk_text: payload_str(payload, &["chunk_text", "chunkText"]).unwrap_or_default(),
            chunk_index,
            total_chunks,
            domain: payload_str(payload, &["domain"]).unwrap_or_default(),
            source_tag: payload_str(payload, &["source_command", "sourceCommand"])
                .unwrap_or_default(),
            file_modified_at: payload_str(payload, &["file_modified_at", "fileModifiedAt"])
                .filter(|s| !s.is_empty()),
            scraped_at: payload_str(payload, &["scraped_at", "scrapedAt"])
                .filter(|s| !s.is_empty()),
            source_path_rel: payload_str(payload, &["source_path_rel", "sourcePathRel"])
                .filter(|s| !s.is_empty()),
        }
    }

    /// Best available provenance timestamp: file modification time, else
    /// scrape time. A value that does not parse is skipped.
    pub fn timestamp_str(&self) -> Option<&str> {
        [self.file_modified_at.as_deref(), self.scraped_at.as_deref()]
            .into_iter()
            .flatten()
            .find(|ts| parse_timestamp_ms(ts).is_some())
    }

    /// [`timestamp_str`](Self::timestamp_str) in Unix milliseconds.
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.timestamp_str().and_then(parse_timestamp_ms)
    }
}

fn payload_str(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

fn payload_u32(payload: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|k| match payload.get(*k)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|v| v.min(u32::MAX as u64) as u32),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

/// An entry in the source list printed under an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub url: String,
    pub title: String,
    pub score: f64,
}

/// Deduplicate matches by canonical URL, keeping the highest score per
/// page.
///
/// Output is sorted by score, descending; equal scores keep first-seen
/// order. The URL and title of the highest-scoring match are kept.
pub fn collect_sources<'a, I>(matches: I) -> Vec<SourceRef>
where
    I: IntoIterator<Item = &'a ScoredMatch>,
{
    let mut keys: Vec<String> = Vec::new();
    let mut sources: Vec<SourceRef> = Vec::new();
    for m in matches {
        let key = canonicalize(&m.url);
        match keys.iter().position(|k| *k == key) {
            Some(slot) => {
                let existing = &mut sources[slot];
                if m.score > existing.score {
                    existing.score = m.score;
                    existing.url = m.url.clone();
                    existing.title = m.title.clone();
                }
            }
            None => {
                keys.push(key);
                sources.push(SourceRef {
                    url: m.url.clone(),
                    title: m.title.clone(),
                    score: m.score,
                });
            }
        }
    }
    sources.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sources
}

/// Why a pipeline run ended without a usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A strict temporal scope ("today", "yesterday") matched nothing.
    EmptyStrictScope,
    /// Not even one full document fits in the context budget.
    BudgetTooSmall,
    /// Every full-document retrieval failed.
    RetrievalFailed,
    /// The vector store returned nothing to work with.
    NoCandidates,
}

/// A terminal, user-facing failure.
///
/// These are expected outcomes that a different set of flags can fix, so
/// they are returned as values rather than as `anyhow` errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl PipelineFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PipelineFailure {}

#[cfg(test)]
pub(crate) fn make_match(url: &str, score: f64, text: &str) -> ScoredMatch {
    ScoredMatch {
        score,
        url: url.to_string(),
        title: String::new(),
        section_header: None,
        chunk_text: text.to_string(),
        chunk_index: 0,
        total_chunks: 1,
        domain: String::new(),
        source_tag: "crawl".to_string(),
        file_modified_at: None,
        scraped_at: None,
        source_path_rel: None,
    }
}

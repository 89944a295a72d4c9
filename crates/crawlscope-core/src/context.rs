//! Character-budgeted prompt context.
//!
//! Full documents go in first, then supplemental chunks, each category in
//! input order. A category stops at its first block that does not fit;
//! later, smaller blocks are not tried. Blocks are joined with a blank
//! line and the joined text never exceeds the budget.

use serde::Serialize;
use std::collections::HashSet;

use crate::canonical::canonicalize;
use crate::models::{collect_sources, FailureKind, PipelineFailure, ScoredMatch, SourceRef};

const SEPARATOR: &str = "\n\n";

/// A page fetched in full for the answer context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    pub url: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Document,
    Chunk,
}

/// One rendered block of the context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextBlock {
    pub kind: BlockKind,
    pub url: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledContext {
    pub blocks: Vec<ContextBlock>,
    /// Length of [`prompt_text`](Self::prompt_text) in chars.
    pub total_chars: usize,
    pub included_documents: usize,
    pub included_chunks: usize,
}

impl AssembledContext {
    pub fn prompt_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    /// Source list for the answer: the matches whose canonical URL made it
    /// into the context, deduplicated by URL.
    pub fn sources(&self, matches: &[ScoredMatch]) -> Vec<SourceRef> {
        let included: HashSet<String> = self.blocks.iter().map(|b| canonicalize(&b.url)).collect();
        let mut sources = collect_sources(
            matches
                .iter()
                .filter(|m| included.contains(&canonicalize(&m.url))),
        );
        // Documents fetched without a matching chunk still get listed.
        for block in &self.blocks {
            if !sources.iter().any(|s| canonicalize(&s.url) == canonicalize(&block.url)) {
                sources.push(SourceRef {
                    url: block.url.clone(),
                    title: block.title.clone(),
                    score: 0.0,
                });
            }
        }
        sources
    }
}

pub fn render_document(number: usize, doc: &RetrievedDocument) -> String {
    format!(
        "[{}] {}\nURL: {}\n\n{}",
        number,
        display_title(&doc.title, &doc.url),
        doc.url,
        doc.content.trim()
    )
}

pub fn render_chunk(number: usize, chunk: &ScoredMatch) -> String {
    let mut heading = display_title(&chunk.title, &chunk.url).to_string();
    if let Some(header) = &chunk.section_header {
        heading.push_str(" > ");
        heading.push_str(header.trim());
    }
    format!(
        "[{}] {} (excerpt {}/{})\nURL: {}\n\n{}",
        number,
        heading,
        chunk.chunk_index.saturating_add(1),
        chunk.total_chunks,
        chunk.url,
        chunk.chunk_text.trim()
    )
}

fn display_title<'a>(title: &'a str, url: &'a str) -> &'a str {
    if title.trim().is_empty() {
        url
    } else {
        title.trim()
    }
}

/// Pack documents, then chunks, under `budget` chars.
///
/// Fails when no document fits (or none was given); chunks alone are never
/// returned.
pub fn pack_context(
    documents: &[RetrievedDocument],
    chunks: &[ScoredMatch],
    budget: usize,
) -> Result<AssembledContext, PipelineFailure> {
    if documents.is_empty() {
        return Err(PipelineFailure::new(
            FailureKind::RetrievalFailed,
            "no full documents were retrieved, so there is no context to answer from",
        ));
    }

    let mut packed = AssembledContext {
        blocks: Vec::new(),
        total_chars: 0,
        included_documents: 0,
        included_chunks: 0,
    };

    for doc in documents {
        let text = render_document(packed.blocks.len() + 1, doc);
        if !try_push(&mut packed, BlockKind::Document, &doc.url, &doc.title, text, budget) {
            break;
        }
        packed.included_documents += 1;
    }

    if packed.included_documents == 0 {
        let needed = render_document(1, &documents[0]).chars().count();
        return Err(PipelineFailure::new(
            FailureKind::BudgetTooSmall,
            format!(
                "context budget of {} chars is too small for the top document ({} chars); \
                 raise --max-context-chars or lower --documents",
                budget, needed
            ),
        ));
    }

    for chunk in chunks {
        let text = render_chunk(packed.blocks.len() + 1, chunk);
        if !try_push(&mut packed, BlockKind::Chunk, &chunk.url, &chunk.title, text, budget) {
            break;
        }
        packed.included_chunks += 1;
    }

    Ok(packed)
}

fn try_push(
    packed: &mut AssembledContext,
    kind: BlockKind,
    url: &str,
    title: &str,
    text: String,
    budget: usize,
) -> bool {
    let separator = if packed.blocks.is_empty() {
        0
    } else {
        SEPARATOR.len()
    };
    let size = text.chars().count() + separator;
    if packed.total_chars + size > budget {
        return false;
    }
    packed.total_chars += size;
    packed.blocks.push(ContextBlock {
        kind,
        url: url.to_string(),
        title: title.to_string(),
        text,
    });
    true
}

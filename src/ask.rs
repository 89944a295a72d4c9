//! The `ask` command: retrieval-augmented question answering.
//!
//! ```text
//! question ─▶ temporal scope ─▶ embed ─▶ vector search ─▶ rerank (+scope)
//!          ─▶ scope filter ─▶ diversity selection ─▶ fetch top documents
//!          ─▶ pack context ─▶ answer + sources
//! ```
//!
//! Terminal outcomes (strict scope with no hits, no document fetched, no
//! document fits the budget) surface as [`PipelineFailure`] errors; the
//! binary prints their message and exits non-zero.

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use crawlscope_core::canonical::{canonicalize, group_by_canonical};
use crawlscope_core::context::{pack_context, AssembledContext, RetrievedDocument};
use crawlscope_core::models::{FailureKind, PipelineFailure, ScoredMatch, SourceRef};
use crawlscope_core::rerank::rerank_matches;
use crawlscope_core::select::select_diverse;
use crawlscope_core::temporal::{apply_temporal_scope, detect_temporal_scope, ScopeOutcome, TemporalScope};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::embedding::ConfiguredEmbedder;
use crate::llm::OpenAiAnswerer;
use crate::scrape::{fetch_documents, FirecrawlClient};
use crate::traits::{Answerer, DocumentFetcher, QueryEmbedder, VectorIndex};
use crate::vector::QdrantIndex;

#[derive(Debug, Clone)]
pub struct AskOptions {
    pub candidate_limit: usize,
    /// Chunks kept after diversity selection.
    pub chunks: usize,
    /// Full documents fetched for the context.
    pub documents: usize,
    pub max_per_url: usize,
    pub max_context_chars: usize,
    pub concurrency: usize,
}

impl AskOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            candidate_limit: config.retrieval.candidate_limit,
            chunks: config.retrieval.ask_chunks,
            documents: config.retrieval.ask_documents,
            max_per_url: config.retrieval.max_per_url,
            max_context_chars: config.retrieval.max_context_chars,
            concurrency: config.scrape.concurrency,
        }
    }
}

/// Everything needed to answer, before the answer model runs.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedContext {
    pub scope: Option<TemporalScope>,
    pub scope_outcome: ScopeOutcome,
    pub context: AssembledContext,
    pub sources: Vec<SourceRef>,
    /// URLs whose full-document fetch failed.
    pub failed_urls: Vec<String>,
}

impl PreparedContext {
    pub fn fallback_used(&self) -> bool {
        self.scope_outcome == ScopeOutcome::Fallback
    }
}

/// The first `limit` distinct sources of `selected`, as (url, title).
fn document_targets(selected: &[ScoredMatch], limit: usize) -> Vec<(String, String)> {
    group_by_canonical(selected)
        .into_iter()
        .filter_map(|g| g.first().map(|m| (m.url.clone(), m.title.clone())))
        .take(limit)
        .collect()
}

/// Run retrieval and context packing for `question` as of `now`.
pub async fn prepare_context<Tz: TimeZone>(
    embedder: &dyn QueryEmbedder,
    index: &dyn VectorIndex,
    fetcher: Arc<dyn DocumentFetcher>,
    question: &str,
    now: &DateTime<Tz>,
    options: &AskOptions,
) -> Result<PreparedContext> {
    let scope = detect_temporal_scope(question, now);
    if let Some(scope) = &scope {
        debug!(label = %scope.label, strict = scope.strict, "temporal scope detected");
    }

    let vector = embedder.embed_query(question).await?;
    let mut matches = index.search(&vector, options.candidate_limit).await?;
    matches.truncate(options.candidate_limit);
    if matches.is_empty() {
        return Err(PipelineFailure::new(
            FailureKind::NoCandidates,
            "no indexed content matched the question; check the collection name and embedding model",
        )
        .into());
    }

    let reranked = rerank_matches(matches, question, scope.as_ref());
    let pool = apply_temporal_scope(reranked, scope.as_ref())?;
    if pool.fallback_used() {
        if let Some(scope) = &scope {
            warn!(
                scope = %scope.label,
                "nothing indexed falls within the time window; answering from all results"
            );
        }
    }

    let selected = select_diverse(&pool.matches, options.chunks, options.max_per_url);
    let targets = document_targets(&selected, options.documents);
    debug!(
        pool = pool.matches.len(),
        selected = selected.len(),
        documents = targets.len(),
        "candidates selected"
    );

    let urls: Vec<String> = targets.iter().map(|(url, _)| url.clone()).collect();
    let outcomes = fetch_documents(fetcher, &urls, options.concurrency).await;

    let mut documents: Vec<RetrievedDocument> = Vec::new();
    let mut failed_urls = Vec::new();
    for (outcome, (_, fallback_title)) in outcomes.into_iter().zip(&targets) {
        match outcome.result {
            Ok(mut doc) => {
                if doc.title.trim().is_empty() {
                    doc.title = fallback_title.clone();
                }
                documents.push(doc);
            }
            Err(error) => {
                warn!(url = %outcome.url, %error, "document unavailable");
                failed_urls.push(outcome.url);
            }
        }
    }

    if documents.is_empty() && !urls.is_empty() {
        return Err(PipelineFailure::new(
            FailureKind::RetrievalFailed,
            format!(
                "all {} document retrievals failed; check the scrape API key and try again",
                urls.len()
            ),
        )
        .into());
    }

    let fetched: HashSet<String> = documents.iter().map(|d| canonicalize(&d.url)).collect();
    let supplemental: Vec<ScoredMatch> = selected
        .iter()
        .filter(|m| !fetched.contains(&canonicalize(&m.url)))
        .cloned()
        .collect();

    let context = pack_context(&documents, &supplemental, options.max_context_chars)?;
    let sources = context.sources(&selected);

    Ok(PreparedContext {
        scope,
        scope_outcome: pool.outcome,
        context,
        sources,
        failed_urls,
    })
}

#[derive(Debug, Serialize)]
struct AskOutput<'a> {
    question: &'a str,
    answer: Option<String>,
    #[serde(flatten)]
    prepared: &'a PreparedContext,
    prompt: String,
}

pub async fn run_ask(
    config: &Config,
    question: &str,
    options: &AskOptions,
    context_only: bool,
    json: bool,
) -> Result<()> {
    let embedder = ConfiguredEmbedder::new(&config.embedding)?;
    let index = QdrantIndex::new(&config.vector)?;
    let fetcher: Arc<dyn DocumentFetcher> = Arc::new(FirecrawlClient::new(&config.scrape)?);
    let answer_enabled = config.answer.is_enabled() && !context_only;
    let answerer = if answer_enabled {
        Some(OpenAiAnswerer::new(&config.answer)?)
    } else {
        None
    };

    let now = Local::now();
    let prepared = prepare_context(&embedder, &index, fetcher, question, &now, options).await?;

    if let Some(scope) = &prepared.scope {
        eprintln!("Scope: {}", scope.describe(&Local));
        if prepared.fallback_used() {
            eprintln!(
                "Note: nothing indexed falls within {}; using all results instead.",
                scope.label
            );
        }
    }
    if !prepared.failed_urls.is_empty() {
        eprintln!(
            "Note: {} document(s) could not be retrieved: {}",
            prepared.failed_urls.len(),
            prepared.failed_urls.join(", ")
        );
    }

    let prompt = prepared.context.prompt_text();
    let answer = match &answerer {
        Some(a) => Some(a.answer(question, &prompt).await?),
        None => None,
    };

    if json {
        let output = AskOutput {
            question,
            answer,
            prepared: &prepared,
            prompt,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match answer {
        Some(text) => println!("{}", text),
        None => println!("{}", prompt),
    }

    println!();
    println!(
        "Sources ({} documents, {} excerpts, {} chars):",
        prepared.context.included_documents,
        prepared.context.included_chunks,
        prepared.context.total_chars
    );
    for (i, source) in prepared.sources.iter().enumerate() {
        let title = if source.title.trim().is_empty() {
            "(untitled)"
        } else {
            source.title.trim()
        };
        println!("  {}. [{:.2}] {}", i + 1, source.score, title);
        println!("     {}", source.url);
    }

    Ok(())
}

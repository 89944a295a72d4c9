//! End-to-end tests for the search and ask pipelines through the public
//! collaborator traits, using in-memory implementations.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use crawlscope::ask::{prepare_context, AskOptions};
use crawlscope::llm::build_prompt;
use crawlscope::search::{search_sources, SearchOptions};
use crawlscope::traits::{Answerer, DocumentFetcher, QueryEmbedder, VectorIndex};
use crawlscope_core::context::{BlockKind, RetrievedDocument};
use crawlscope_core::models::ScoredMatch;
use crawlscope_core::snippet::PreviewParams;
use crawlscope_core::temporal::ScopeOutcome;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

// ─── Test collaborators ─────────────────────────────────────────────

struct KeywordEmbedder;

#[async_trait]
impl QueryEmbedder for KeywordEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vec![text.len() as f32])
    }
}

/// Returns its hits in stored order, like a vector store that already
/// sorted by similarity.
struct InMemoryIndex {
    hits: Vec<ScoredMatch>,
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn search(&self, _vector: &[f32], limit: usize) -> Result<Vec<ScoredMatch>> {
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

struct InMemoryPages {
    pages: HashMap<String, (String, String)>, // url -> (title, markdown)
}

#[async_trait]
impl DocumentFetcher for InMemoryPages {
    async fn fetch(&self, url: &str) -> Result<RetrievedDocument> {
        let (title, content) = self
            .pages
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("404 for {}", url))?;
        Ok(RetrievedDocument {
            url: url.to_string(),
            title: title.clone(),
            content: content.clone(),
        })
    }
}

/// Echoes the question and how many sources it was given.
struct CountingAnswerer;

#[async_trait]
impl Answerer for CountingAnswerer {
    async fn answer(&self, question: &str, context: &str) -> Result<String> {
        let prompt = build_prompt(question, context);
        let sources = prompt.lines().filter(|l| l.starts_with("URL: ")).count();
        Ok(format!("{} sources for: {}", sources, question))
    }
}

fn chunk(url: &str, score: f64, title: &str, index: u32, text: &str, scraped_at: &str) -> ScoredMatch {
    ScoredMatch::from_payload(
        score,
        &json!({
            "url": url,
            "title": title,
            "chunk_text": text,
            "chunk_index": index,
            "total_chunks": 3,
            "scraped_at": scraped_at,
            "source_command": "crawl",
        }),
    )
}

fn corpus() -> Vec<ScoredMatch> {
    vec![
        chunk(
            "https://docs.tool.dev/en/hooks?utm_source=nav",
            0.88,
            "Hooks",
            0,
            "Skip to content\nMenu\n# Hooks\nHooks run shell commands at fixed points in a session. \
             Configure hooks in the settings file. Each hook receives JSON on stdin.",
            "2026-10-18T08:00:00Z",
        ),
        chunk(
            "https://docs.tool.dev/en/hooks",
            0.86,
            "Hooks",
            1,
            "A PreToolUse hook can block a tool call by exiting with code 2.",
            "2026-10-18T08:00:00Z",
        ),
        chunk(
            "https://docs.tool.dev/de/hooks",
            0.87,
            "Hooks (Deutsch)",
            0,
            "Hooks fuehren Shell-Befehle aus.",
            "2026-10-01T08:00:00Z",
        ),
        chunk(
            "https://tool.dev/pricing",
            0.85,
            "Pricing",
            0,
            "Plans for teams of every size.",
            "2026-10-02T08:00:00Z",
        ),
        chunk(
            "https://blog.tool.dev/notes/hooks-in-practice",
            0.80,
            "Hooks in practice",
            0,
            "We use hooks to format code after every edit.",
            "2026-10-17T20:00:00Z",
        ),
    ]
}

fn pages() -> InMemoryPages {
    let mut pages = HashMap::new();
    pages.insert(
        "https://docs.tool.dev/en/hooks?utm_source=nav".to_string(),
        (
            "Hooks".to_string(),
            "# Hooks\n\nHooks run shell commands at fixed points in a session.".to_string(),
        ),
    );
    pages.insert(
        "https://blog.tool.dev/notes/hooks-in-practice".to_string(),
        (
            "Hooks in practice".to_string(),
            "We use hooks to format code after every edit.".to_string(),
        ),
    );
    InMemoryPages { pages }
}

// ─── Search ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_search_reranks_groups_and_previews() {
    let index = InMemoryIndex { hits: corpus() };
    let options = SearchOptions {
        candidate_limit: 40,
        limit: 2,
        rerank: true,
        preview: PreviewParams::default(),
    };

    let hits = search_sources(&KeywordEmbedder, &index, "hooks", &options)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    // English docs win; the tracking parameter is gone from the key.
    assert_eq!(hits[0].canonical_url, "https://docs.tool.dev/en/hooks");
    assert_eq!(hits[0].chunks, 2);
    assert!(!hits[0].preview.contains("Skip to content"));
    assert!(!hits[0].preview.contains("Menu"));
    assert!(hits.iter().all(|h| h.canonical_url != "https://tool.dev/pricing"));
}

// ─── Ask ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ask_pipeline_builds_context_and_answers() {
    let index = InMemoryIndex { hits: corpus() };
    let options = AskOptions {
        candidate_limit: 40,
        chunks: 4,
        documents: 2,
        max_per_url: 1,
        max_context_chars: 4_000,
        concurrency: 2,
    };
    let now = Utc.with_ymd_and_hms(2026, 10, 18, 21, 0, 0).unwrap();
    let question = "how do hooks work this week?";

    let prepared = prepare_context(
        &KeywordEmbedder,
        &index,
        Arc::new(pages()),
        question,
        &now,
        &options,
    )
    .await
    .unwrap();

    // Oct 12-18 keeps the English docs and the blog post.
    assert_eq!(
        prepared.scope_outcome,
        ScopeOutcome::Scoped {
            kept: 3,
            dropped: 2
        }
    );
    assert!(prepared.failed_urls.is_empty());
    assert_eq!(prepared.context.included_documents, 2);
    assert_eq!(prepared.context.blocks[0].kind, BlockKind::Document);
    assert!(prepared.context.total_chars <= 4_000);
    assert!(prepared
        .sources
        .iter()
        .all(|s| !s.url.contains("/de/") && !s.url.contains("pricing")));

    let answer = CountingAnswerer
        .answer(question, &prepared.context.prompt_text())
        .await
        .unwrap();
    assert!(answer.starts_with(&format!("{} sources", prepared.context.blocks.len())));
}

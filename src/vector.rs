//! Qdrant REST client for chunk search.
//!
//! Only `POST /collections/{collection}/points/search` is used. Each hit's
//! payload goes through [`ScoredMatch::from_payload`], which tolerates
//! missing and mistyped keys, so collections written by older crawls still
//! search cleanly.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use crawlscope_core::models::ScoredMatch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::VectorConfig;
use crate::traits::VectorIndex;

pub struct QdrantIndex {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    vector_name: Option<String>,
}

impl QdrantIndex {
    pub fn new(config: &VectorConfig) -> Result<Self> {
        if !(config.url.starts_with("http://") || config.url.starts_with("https://")) {
            bail!("vector.url must be an http(s) URL, got '{}'", config.url);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Qdrant HTTP client")?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            client,
            endpoint: search_endpoint(&config.url, &config.collection),
            api_key,
            vector_name: config.vector_name.clone(),
        })
    }
}

fn search_endpoint(base: &str, collection: &str) -> String {
    format!(
        "{}/collections/{}/points/search",
        base.trim_end_matches('/'),
        collection
    )
}

#[derive(Serialize)]
#[serde(untagged)]
enum QueryVector<'a> {
    Plain(&'a [f32]),
    Named { name: &'a str, vector: &'a [f32] },
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: QueryVector<'a>,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    payload: Value,
}

fn parse_hits(body: SearchResponse) -> Vec<ScoredMatch> {
    body.result
        .iter()
        .map(|hit| ScoredMatch::from_payload(hit.score, &hit.payload))
        .collect()
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredMatch>> {
        let request = SearchRequest {
            vector: match &self.vector_name {
                Some(name) => QueryVector::Named { name, vector },
                None => QueryVector::Plain(vector),
            },
            limit,
            with_payload: true,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Qdrant search request failed: {}", self.endpoint))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Qdrant search returned {}: {}", status, text);
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Qdrant search response")?;
        let matches = parse_hits(body);
        debug!(hits = matches.len(), limit, "vector search complete");
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_endpoint() {
        assert_eq!(
            search_endpoint("http://localhost:6333/", "docs"),
            "http://localhost:6333/collections/docs/points/search"
        );
    }

    #[test]
    fn test_request_body_plain_and_named() {
        let v = [0.5f32, 1.0];
        let plain = SearchRequest {
            vector: QueryVector::Plain(&v),
            limit: 3,
            with_payload: true,
        };
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({"vector": [0.5, 1.0], "limit": 3, "with_payload": true})
        );

        let named = SearchRequest {
            vector: QueryVector::Named {
                name: "text",
                vector: &v,
            },
            limit: 3,
            with_payload: true,
        };
        assert_eq!(
            serde_json::to_value(&named).unwrap()["vector"],
            json!({"name": "text", "vector": [0.5, 1.0]})
        );
    }

    #[test]
    fn test_parse_hits_tolerates_sparse_payloads() {
        let body: SearchResponse = serde_json::from_value(json!({
            "result": [
                {"id": 1, "score": 0.8, "payload": {"url": "https://a.dev/x", "title": "X", "chunk_index": 2, "total_chunks": 5}},
                {"id": "b", "score": 0.6},
                {"id": 3, "score": 0.5, "payload": {"url": 42}}
            ],
            "status": "ok"
        }))
        .unwrap();
        let matches = parse_hits(body);
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].title, "X");
        assert_eq!(matches[0].chunk_index, 2);
        assert_eq!(matches[1].url, "");
        assert_eq!(matches[2].url, "");
        assert_eq!(matches[2].total_chunks, 1);
    }

    #[test]
    fn test_missing_result_is_empty() {
        let body: SearchResponse = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert!(parse_hits(body).is_empty());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let config = VectorConfig {
            url: "localhost:6333".to_string(),
            ..VectorConfig::default()
        };
        assert!(QdrantIndex::new(&config).is_err());
    }
}

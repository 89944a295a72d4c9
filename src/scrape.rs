//! Full-page retrieval through a Firecrawl-compatible scrape API, and the
//! bounded fan-out used by `ask`.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use crawlscope_core::context::RetrievedDocument;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::ScrapeConfig;
use crate::traits::DocumentFetcher;

/// `POST {api_url}/v1/scrape`, Markdown only.
pub struct FirecrawlClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl FirecrawlClient {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build scrape HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/scrape", config.api_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'a str; 1],
    only_main_content: bool,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<ScrapeData>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<ScrapeMetadata>,
}

#[derive(Debug, Deserialize)]
struct ScrapeMetadata {
    #[serde(default)]
    title: Option<String>,
}

fn into_document(url: &str, body: ScrapeResponse) -> Result<RetrievedDocument> {
    if !body.success {
        bail!(
            "scrape failed: {}",
            body.error.as_deref().unwrap_or("no error message")
        );
    }
    let data = body.data.context("scrape response has no data")?;
    let content = data
        .markdown
        .filter(|m| !m.trim().is_empty())
        .context("scrape returned no markdown content")?;
    let title = data
        .metadata
        .and_then(|m| m.title)
        .unwrap_or_default();

    Ok(RetrievedDocument {
        url: url.to_string(),
        title,
        content,
    })
}

#[async_trait]
impl DocumentFetcher for FirecrawlClient {
    async fn fetch(&self, url: &str) -> Result<RetrievedDocument> {
        let request = ScrapeRequest {
            url,
            formats: ["markdown"],
            only_main_content: true,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("scrape request failed for {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("scrape API returned {}: {}", status, text);
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .context("Failed to parse scrape response")?;
        into_document(url, body)
    }
}

/// One fetch result, tagged with the URL it was for.
#[derive(Debug)]
pub struct FetchOutcome {
    pub url: String,
    pub result: Result<RetrievedDocument>,
}

/// Fetch every URL with at most `concurrency` requests in flight.
///
/// Outcomes come back in `urls` order. Failures are returned, not raised.
pub async fn fetch_documents(
    fetcher: Arc<dyn DocumentFetcher>,
    urls: &[String],
    concurrency: usize,
) -> Vec<FetchOutcome> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (i, url) in urls.iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let semaphore = Arc::clone(&semaphore);
        let url = url.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            debug!(%url, "fetching document");
            (i, fetcher.fetch(&url).await)
        });
    }

    let mut results: Vec<Option<Result<RetrievedDocument>>> = urls.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((i, result)) => results[i] = Some(result),
            Err(error) => warn!(%error, "document fetch task did not finish"),
        }
    }

    urls.iter()
        .zip(results)
        .map(|(url, result)| FetchOutcome {
            url: url.clone(),
            result: result.unwrap_or_else(|| Err(anyhow!("fetch task did not finish"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_request_body_shape() {
        let request = ScrapeRequest {
            url: "https://a.dev/x",
            formats: ["markdown"],
            only_main_content: true,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"url": "https://a.dev/x", "formats": ["markdown"], "onlyMainContent": true})
        );
    }

    #[test]
    fn test_into_document_success() {
        let body: ScrapeResponse = serde_json::from_value(json!({
            "success": true,
            "data": {"markdown": "# Guide\n\nBody", "metadata": {"title": "Guide", "sourceURL": "https://a.dev/x"}}
        }))
        .unwrap();
        let doc = into_document("https://a.dev/x", body).unwrap();
        assert_eq!(doc.title, "Guide");
        assert_eq!(doc.content, "# Guide\n\nBody");
    }

    #[test]
    fn test_into_document_failure_and_empty() {
        let failed: ScrapeResponse =
            serde_json::from_value(json!({"success": false, "error": "blocked"})).unwrap();
        assert!(into_document("u", failed).unwrap_err().to_string().contains("blocked"));

        let empty: ScrapeResponse =
            serde_json::from_value(json!({"success": true, "data": {"markdown": "  "}})).unwrap();
        assert!(into_document("u", empty).is_err());
    }

    struct SlowFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DocumentFetcher for SlowFetcher {
        async fn fetch(&self, url: &str) -> Result<RetrievedDocument> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if url.contains("bad") {
                bail!("unreachable");
            }
            Ok(RetrievedDocument {
                url: url.to_string(),
                title: String::new(),
                content: format!("content of {}", url),
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_documents_bounded_and_ordered() {
        let fetcher = Arc::new(SlowFetcher {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let urls: Vec<String> = (0..6)
            .map(|i| {
                if i == 2 {
                    "https://bad.dev/".to_string()
                } else {
                    format!("https://a.dev/{}", i)
                }
            })
            .collect();

        let outcomes = fetch_documents(fetcher.clone(), &urls, 2).await;

        assert_eq!(outcomes.len(), 6);
        for (outcome, url) in outcomes.iter().zip(&urls) {
            assert_eq!(&outcome.url, url);
        }
        assert!(outcomes[2].result.is_err());
        assert_eq!(outcomes.iter().filter(|o| o.result.is_ok()).count(), 5);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_fetch_documents_empty() {
        let fetcher = Arc::new(SlowFetcher {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        assert!(fetch_documents(fetcher, &[], 4).await.is_empty());
    }
}

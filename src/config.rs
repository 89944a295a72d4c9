//! TOML configuration.
//!
//! Every section is optional; a missing key takes the default shown in
//! `config/crawlscope.example.toml`. [`load_config`] parses and validates.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorConfig {
    /// Qdrant REST endpoint.
    #[serde(default = "default_vector_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Named vector to search, for collections with more than one.
    #[serde(default)]
    pub vector_name: Option<String>,
    /// Environment variable holding the Qdrant API key, if any.
    #[serde(default = "default_qdrant_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: default_vector_url(),
            collection: default_collection(),
            vector_name: None,
            api_key_env: default_qdrant_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_vector_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection() -> String {
    "crawlscope".to_string()
}
fn default_qdrant_key_env() -> String {
    "QDRANT_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    /// Firecrawl-compatible API base URL.
    #[serde(default = "default_scrape_url")]
    pub api_url: String,
    #[serde(default = "default_firecrawl_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_scrape_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum documents fetched at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            api_url: default_scrape_url(),
            api_key_env: default_firecrawl_key_env(),
            timeout_secs: default_scrape_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_scrape_url() -> String {
    "https://api.firecrawl.dev".to_string()
}
fn default_firecrawl_key_env() -> String {
    "FIRECRAWL_API_KEY".to_string()
}
fn default_scrape_timeout_secs() -> u64 {
    60
}
fn default_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Hits requested from the vector store per query.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
    /// Distinct sources shown by `search`.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Apply the lexical rerank in `search` (always on for `ask`).
    #[serde(default)]
    pub rerank: bool,
    #[serde(default = "default_ask_chunks")]
    pub ask_chunks: usize,
    #[serde(default = "default_ask_documents")]
    pub ask_documents: usize,
    #[serde(default = "default_max_per_url")]
    pub max_per_url: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_limit: default_candidate_limit(),
            search_limit: default_search_limit(),
            rerank: false,
            ask_chunks: default_ask_chunks(),
            ask_documents: default_ask_documents(),
            max_per_url: default_max_per_url(),
            max_context_chars: default_max_context_chars(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_candidate_limit() -> usize {
    40
}
fn default_search_limit() -> usize {
    5
}
fn default_ask_chunks() -> usize {
    8
}
fn default_ask_documents() -> usize {
    3
}
fn default_max_per_url() -> usize {
    2
}
fn default_max_context_chars() -> usize {
    24_000
}
/// Previews never run longer than this.
pub const MAX_PREVIEW_CHARS: usize = 700;

fn default_preview_chars() -> usize {
    MAX_PREVIEW_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    #[serde(default = "default_answer_provider")]
    pub provider: String,
    #[serde(default = "default_answer_model")]
    pub model: String,
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_answer_url")]
    pub api_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_answer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: default_answer_provider(),
            model: default_answer_model(),
            api_url: default_answer_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_answer_timeout_secs(),
        }
    }
}

impl AnswerConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_answer_provider() -> String {
    "openai".to_string()
}
fn default_answer_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_answer_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> usize {
    800
}
fn default_answer_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let r = &config.retrieval;
    if r.candidate_limit == 0 {
        bail!("retrieval.candidate_limit must be >= 1");
    }
    if r.search_limit == 0 {
        bail!("retrieval.search_limit must be >= 1");
    }
    if r.max_per_url == 0 {
        bail!("retrieval.max_per_url must be >= 1");
    }
    if r.max_context_chars == 0 {
        bail!("retrieval.max_context_chars must be >= 1");
    }
    if r.preview_chars == 0 || r.preview_chars > MAX_PREVIEW_CHARS {
        bail!(
            "retrieval.preview_chars must be between 1 and {}",
            MAX_PREVIEW_CHARS
        );
    }

    if config.vector.collection.trim().is_empty() {
        bail!("vector.collection must not be empty");
    }
    if config.scrape.concurrency == 0 {
        bail!("scrape.concurrency must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    // The local provider has per-model defaults.
    if matches!(config.embedding.provider.as_str(), "openai" | "ollama") {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.answer.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown answer provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}

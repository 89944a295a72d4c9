//! Answer generation over an OpenAI-compatible chat completions API.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AnswerConfig;
use crate::traits::Answerer;

pub const SYSTEM_PROMPT: &str = "You answer questions about web pages using only the numbered \
sources provided. Cite sources inline as [n]. If the sources do not contain the answer, say so \
plainly instead of guessing.";

/// The user message sent with the packed context.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Sources:\n\n{}\n\n---\n\nQuestion: {}",
        context.trim(),
        question.trim()
    )
}

pub struct OpenAiAnswerer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OpenAiAnswerer {
    /// Requires `OPENAI_API_KEY`.
    pub fn new(config: &AnswerConfig) -> Result<Self> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| anyhow!("OPENAI_API_KEY not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build answer HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_answer(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| anyhow!("answer model returned no content"))
}

#[async_trait]
impl Answerer for OpenAiAnswerer {
    async fn answer(&self, question: &str, context: &str) -> Result<String> {
        let prompt = build_prompt(question, context);
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call chat completions")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("chat completions returned {}: {}", status, text);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to parse chat completions response")?;
        first_answer(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("  What is X? ", "[1] Doc\nURL: u\n\nbody\n");
        assert_eq!(
            prompt,
            "Sources:\n\n[1] Doc\nURL: u\n\nbody\n\n---\n\nQuestion: What is X?"
        );
    }

    #[test]
    fn test_first_answer() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": " X is a tool [1]. "}}]
        }))
        .unwrap();
        assert_eq!(first_answer(response).unwrap(), "X is a tool [1].");
    }

    #[test]
    fn test_first_answer_empty() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(first_answer(response).is_err());
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(first_answer(response).is_err());
    }
}

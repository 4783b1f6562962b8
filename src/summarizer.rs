//! Summarizer port: a single operation the manager calls to compress
//! episodic content under pressure. Held as `Arc<dyn Summarizer>` by
//! whoever owns the manager — a relation, not ownership.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer initialization failed: {0}")]
    Initialization(String),
    #[error("summarizer network error: {0}")]
    Network(String),
    #[error("summarizer API error: {0}")]
    Api(String),
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condense `text` into a form whose estimated token count is at most
    /// `text`'s own. Returning the input unchanged is always a valid
    /// (if degenerate) implementation for `target_tokens >= input size`.
    async fn summarize_topic_content(
        &self,
        text: &str,
        target_tokens: usize,
    ) -> Result<String, SummarizerError>;
}

/// Zero-dependency fallback: truncates to the target size on a word
/// boundary. Used whenever no LLM-backed summarizer is configured, and as
/// the automatic fallback if the LLM summarizer fails to initialize.
#[derive(Debug, Clone, Default)]
pub struct TruncatingSummarizer;

#[async_trait]
impl Summarizer for TruncatingSummarizer {
    async fn summarize_topic_content(
        &self,
        text: &str,
        target_tokens: usize,
    ) -> Result<String, SummarizerError> {
        let target_chars = target_tokens * 4;
        if text.len() <= target_chars {
            return Ok(text.to_string());
        }
        let mut cut = target_chars.min(text.len());
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        let truncated = match text[..cut].rfind(char::is_whitespace) {
            Some(idx) if idx > 0 => &text[..idx],
            _ => &text[..cut],
        };
        Ok(format!("{}…", truncated))
    }
}

/// Configuration for the LLM-backed summarizer.
#[derive(Debug, Clone)]
pub struct LlmSummarizerConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for LlmSummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// LLM-based summarizer using an OpenAI-compatible chat completion endpoint.
pub struct LlmSummarizer {
    client: reqwest::Client,
    config: LlmSummarizerConfig,
}

#[derive(serde::Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(serde::Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl LlmSummarizer {
    pub fn new(config: LlmSummarizerConfig) -> Result<Self, SummarizerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SummarizerError::Initialization(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_prompt(&self, text: &str, target_tokens: usize) -> String {
        format!(
            "Summarize the following topic content for a spoken tutoring session. \
            Preserve key definitions and the core explanation. Keep the summary under \
            {} tokens.\n\n{}",
            target_tokens, text
        )
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize_topic_content(
        &self,
        text: &str,
        target_tokens: usize,
    ) -> Result<String, SummarizerError> {
        if text.is_empty() {
            return Ok(String::new());
        }

        debug!(target_tokens, "summarizing topic content via LLM");

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a concise tutoring-content summarizer.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: self.build_prompt(text, target_tokens),
                },
            ],
            max_tokens: target_tokens,
            temperature: 0.3,
        };

        let mut last_error = None;
        for attempt in 0..self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * (1 << attempt))).await;
            }

            let mut req = self.client.post(&self.config.endpoint).json(&request);
            if let Some(api_key) = &self.config.api_key {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }

            match req.send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<ChatCompletionResponse>().await {
                        Ok(parsed) => {
                            if let Some(choice) = parsed.choices.into_iter().next() {
                                return Ok(choice.message.content);
                            }
                            last_error = Some(SummarizerError::Api("no choices in response".into()));
                        }
                        Err(e) => {
                            last_error = Some(SummarizerError::Api(format!("parse failure: {}", e)))
                        }
                    }
                }
                Ok(response) => {
                    let status = response.status();
                    last_error = Some(SummarizerError::Api(format!("HTTP {}", status)));
                }
                Err(e) => last_error = Some(SummarizerError::Network(e.to_string())),
            }
        }

        warn!("LLM summarization failed after {} attempts", self.config.max_retries);
        Err(last_error.unwrap_or(SummarizerError::Api("unknown failure".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn truncating_summarizer_passes_short_text_through() {
        let summarizer = TruncatingSummarizer;
        let out = summarizer.summarize_topic_content("short text", 100).await.unwrap();
        assert_eq!(out, "short text");
    }

    #[tokio::test]
    async fn truncating_summarizer_shrinks_long_text() {
        let summarizer = TruncatingSummarizer;
        let long = "word ".repeat(2000);
        let out = summarizer.summarize_topic_content(&long, 10).await.unwrap();
        assert!(out.len() < long.len());
        assert!(out.ends_with('…'));
    }
}

//! LLM-backed topic classification.
//!
//! Sends one chat-completion request per abstract to an OpenAI-compatible
//! API, with bounded concurrency, and reads back a JSON list of topic codes.

use super::Classifier;
use crate::catalog::TopicCatalog;
use crate::error::{PapersError, Result};
use crate::prompts::topic_labels::{build_user_prompt, render_topic_list, SYSTEM_PROMPT};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum concurrent LLM API requests
const MAX_CONCURRENT_REQUESTS: usize = 10;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Upper bound on reply length; a label list is short
const MAX_REPLY_TOKENS: u32 = 200;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Tokens billed across a classifier's requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Classifier calling an OpenAI-compatible chat completion endpoint
pub struct LlmClassifier {
    client: reqwest::Client,
    config: LlmConfig,
    topic_list: String,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl LlmClassifier {
    pub fn new(config: LlmConfig, catalog: &TopicCatalog) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PapersError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            topic_list: render_topic_list(catalog),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        })
    }

    /// Tokens consumed so far
    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }

    fn record(&self, usage: TokenUsage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
    }

    async fn classify_one(&self, abstract_text: &str, idx: usize) -> Result<(BTreeSet<String>, TokenUsage)> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_user_prompt(&self.topic_list, abstract_text)}
            ],
            "temperature": 0.0,
            "max_tokens": MAX_REPLY_TOKENS
        });

        let api_url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        debug!(idx = idx, "Sending LLM request");

        let response = self
            .client
            .post(&api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PapersError::Api {
                code: status.as_u16() as i32,
                message: format!("LLM API error: {} - {}", status, error_text),
            });
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| PapersError::Parse(format!("Failed to parse LLM response: {}", e)))?;

        let content = reply
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        Ok((parse_labels(content), reply.usage.unwrap_or_default()))
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, abstracts: &[String]) -> Result<Vec<BTreeSet<String>>> {
        info!(
            count = abstracts.len(),
            model = %self.config.model,
            "Starting LLM topic classification"
        );

        // `buffered` keeps replies in input order
        let labels: Vec<BTreeSet<String>> = stream::iter(abstracts.to_vec().into_iter().enumerate())
            .map(|(idx, text)| async move {
                match self.classify_one(&text, idx).await {
                    Ok((labels, usage)) => {
                        self.record(usage);
                        labels
                    }
                    Err(e) => {
                        warn!(idx = idx, error = %e, "Failed to classify abstract");
                        BTreeSet::new()
                    }
                }
            })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .collect()
            .await;

        let usage = self.usage();
        info!(
            classified = labels.iter().filter(|l| !l.is_empty()).count(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "LLM classification complete"
        );

        Ok(labels)
    }
}

/// Parse the model's JSON reply into a set of upper-cased codes.
fn parse_labels(content: &str) -> BTreeSet<String> {
    #[derive(Deserialize)]
    struct LlmOutput {
        topics: Vec<String>,
    }

    match serde_json::from_str::<LlmOutput>(&extract_json(content)) {
        Ok(output) => output
            .topics
            .into_iter()
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect(),
        Err(e) => {
            let preview: String = content.chars().take(200).collect();
            info!(
                error = %e,
                content_preview = %preview,
                "LLM output parse failed - no labels"
            );
            BTreeSet::new()
        }
    }
}

/// Extract JSON from LLM response (handles markdown code blocks)
fn extract_json(content: &str) -> String {
    let trimmed = content.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() >= 2 {
            let end = if lines.last().map(|l| l.trim()) == Some("```") {
                lines.len() - 1
            } else {
                lines.len()
            };
            return lines[1..end].join("\n");
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    #[test]
    fn test_extract_json_code_block() {
        let input = "```json\n{\"topics\": [\"AI\"]}\n```";
        assert_eq!(extract_json(input), "{\"topics\": [\"AI\"]}");
    }

    #[test]
    fn test_extract_json_with_text() {
        let input = r#"Sure: {"topics": ["DB"]} hope that helps"#;
        assert_eq!(extract_json(input), r#"{"topics": ["DB"]}"#);
    }

    #[test]
    fn test_parse_labels() {
        let labels = parse_labels(r#"{"topics": ["cv", " LG ", ""]}"#);
        assert_eq!(labels, BTreeSet::from(["CV".to_string(), "LG".to_string()]));
        assert!(parse_labels("I cannot tell.").is_empty());
    }

    /// Minimal `/chat/completions` endpoint keyed on a word in the abstract
    async fn chat_completions(Json(body): Json<serde_json::Value>) -> (StatusCode, Json<serde_json::Value>) {
        let prompt = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();

        let (content, prompt_tokens, completion_tokens) = if prompt.contains("zebra") {
            // finishes last so ordering cannot come from completion order
            tokio::time::sleep(Duration::from_millis(50)).await;
            ("```json\n{\"topics\": [\"cv\", \"RO\"]}\n```", 100, 7)
        } else if prompt.contains("walrus") {
            (r#"{"topics": ["DB"]}"#, 80, 5)
        } else {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "overloaded"})),
            );
        };

        (
            StatusCode::OK,
            Json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": content}}],
                "usage": {
                    "prompt_tokens": prompt_tokens,
                    "completion_tokens": completion_tokens,
                    "total_tokens": prompt_tokens + completion_tokens
                }
            })),
        )
    }

    async fn spawn_chat_server() -> String {
        let app = Router::new().route("/chat/completions", post(chat_completions));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_classify_batch_keeps_input_order() {
        let config = LlmConfig {
            base_url: spawn_chat_server().await,
            api_key: "test-key".into(),
            model: "test-model".into(),
        };
        let classifier = LlmClassifier::new(config, &TopicCatalog::standard()).unwrap();

        let labels = classifier
            .classify(&[
                "A zebra crossing detector for robots.".to_string(),
                "Indexing walrus sightings in a relational store.".to_string(),
                "An abstract the server refuses.".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0], BTreeSet::from(["CV".to_string(), "RO".to_string()]));
        assert_eq!(labels[1], BTreeSet::from(["DB".to_string()]));
        assert!(labels[2].is_empty());

        let usage = classifier.usage();
        assert_eq!(usage.prompt_tokens, 180);
        assert_eq!(usage.completion_tokens, 12);
        assert_eq!(usage.total(), 192);
    }
}

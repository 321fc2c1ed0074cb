//! Anthropic Messages API client
//!
//! Sends a single-turn prompt (plus optional system prompt) to the
//! `/v1/messages` endpoint and returns the concatenated text blocks of
//! the reply.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::{LlmClient, Result};

const DEFAULT_API_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const API_VERSION: &str = "2023-06-01";

/// Completion client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the API server
    pub api_url: String,
    /// Model identifier
    pub model: String,
    /// API key (required for requests, optional for construction)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            api_url: std::env::var("CAHIER_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            model: std::env::var("CAHIER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            max_tokens: std::env::var("CAHIER_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4096),
            timeout_secs: std::env::var("CAHIER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        }
    }
}

impl LlmConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific model
    pub fn new(api_url: &str, model: &str) -> Self {
        LlmConfig {
            api_url: api_url.to_string(),
            model: model.to_string(),
            api_key: None,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Override the model
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn build_request<'a>(
    config: &'a LlmConfig,
    prompt: &'a str,
    system_prompt: Option<&'a str>,
) -> MessagesRequest<'a> {
    MessagesRequest {
        model: &config.model,
        max_tokens: config.max_tokens,
        system: system_prompt,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
    }
}

/// Join the text blocks of a reply. Non-text blocks are skipped.
fn extract_text(response: MessagesResponse) -> Result<String> {
    let text: String = response
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(LlmError::Content("reply contained no text".to_string()));
    }
    Ok(text)
}

fn classify_status(status: reqwest::StatusCode, body: String) -> LlmError {
    // 529 is the API's "overloaded" status
    if status.is_server_error() || status.as_u16() == 429 || status.as_u16() == 529 {
        LlmError::Transient(format!("status {}: {}", status.as_u16(), body))
    } else {
        LlmError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}

/// HTTP client for the Anthropic Messages API
pub struct AnthropicClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a new client
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("cahier-llm/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(AnthropicClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LlmConfig::from_env())
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::Config("ANTHROPIC_API_KEY is not set".to_string()))?;

        let body = build_request(&self.config, prompt, system_prompt);
        debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "sending completion request"
        );

        let response = self
            .http_client
            .post(self.config.messages_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_status(status, body);
            warn!(status = status.as_u16(), error = %err, "completion request failed");
            return Err(err);
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = extract_text(parsed)?;
        debug!(reply_chars = text.len(), "completion received");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

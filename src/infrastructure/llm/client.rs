//! HTTP client for the rewrite-service messages API.

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::RewriteApiError;
use super::retry::RetryPolicy;
use crate::domain::models::RewriterConfig;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f64,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client configuration, derived from [`RewriterConfig`] plus the API
/// key from the environment.
#[derive(Debug, Clone)]
pub struct MessagesClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

impl MessagesClientConfig {
    /// Build from the rewriter section; the key comes from
    /// `ANTHROPIC_API_KEY`.
    pub fn from_rewriter_config(config: &RewriterConfig) -> Result<Self, RewriteApiError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| RewriteApiError::Auth("ANTHROPIC_API_KEY not set".to_string()))?;
        Ok(Self {
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

/// Messages API client with retry on transient failures.
pub struct MessagesClient {
    http: ReqwestClient,
    config: MessagesClientConfig,
    retry: RetryPolicy,
}

impl MessagesClient {
    pub fn new(
        config: MessagesClientConfig,
        retry: RetryPolicy,
    ) -> Result<Self, RewriteApiError> {
        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config,
            retry,
        })
    }

    /// Request one completion and return the concatenated text blocks.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String, RewriteApiError> {
        self.retry
            .execute(|| self.send_once(system, prompt))
            .await
    }

    async fn send_once(&self, system: &str, prompt: &str) -> Result<String, RewriteApiError> {
        let request = MessageRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.config.model, "sending rewrite request");
        let response = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RewriteApiError::Timeout
                } else {
                    RewriteApiError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RewriteApiError::from_status(status, body));
        }

        let message: MessageResponse = response.json().await?;
        let text: String = message
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            return Err(RewriteApiError::Malformed(
                "response carried no text content".to_string(),
            ));
        }
        Ok(text)
    }
}

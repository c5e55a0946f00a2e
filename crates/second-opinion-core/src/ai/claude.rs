use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, malformed, upstream_error, BackendAdapter, NO_RESPONSE};
use crate::backend::Backend;
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: http_client(None),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(Some(timeout));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn query(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![ClaudeMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error("Claude", response).await);
        }

        let claude_response: ClaudeResponse =
            response.json().await.map_err(|e| malformed("Claude", e))?;
        Ok(extract_text(claude_response))
    }
}

/// Only the first content block is considered, and only if it is a text block.
fn extract_text(response: ClaudeResponse) -> String {
    response
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .unwrap_or_else(|| NO_RESPONSE.to_string())
}

#[async_trait]
impl BackendAdapter for ClaudeClient {
    fn backend(&self) -> Backend {
        Backend::Claude
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.query(prompt).await
    }
}

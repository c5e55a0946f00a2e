use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, malformed, upstream_error, BackendAdapter, NO_RESPONSE};
use crate::backend::Backend;
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const SYSTEM_PROMPT: &str = "Please format your responses using markdown.";

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    #[serde(default)]
    message: Option<OpenAIResponseMessage>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIClient {
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
        let request = OpenAIRequest {
            model: &self.model,
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                OpenAIMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error("OpenAI", response).await);
        }

        let openai_response: OpenAIResponse =
            response.json().await.map_err(|e| malformed("OpenAI", e))?;
        Ok(extract_text(openai_response))
    }
}

fn extract_text(response: OpenAIResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_else(|| NO_RESPONSE.to_string())
}

#[async_trait]
impl BackendAdapter for OpenAIClient {
    fn backend(&self) -> Backend {
        Backend::ChatGpt
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.query(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> OpenAIResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_extract_first_choice() {
        let r = parse(r#"{"choices":[{"message":{"role":"assistant","content":"Hi GPT"}}]}"#);
        assert_eq!(extract_text(r), "Hi GPT");
    }

    #[test]
    fn test_extract_null_content_falls_back() {
        let r = parse(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#);
        assert_eq!(extract_text(r), NO_RESPONSE);
    }

    #[test]
    fn test_extract_no_choices_falls_back() {
        let r = parse(r#"{"choices":[]}"#);
        assert_eq!(extract_text(r), NO_RESPONSE);
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::http::{DispatchRequest, Envelope, Health, CHAT_PATH, HEALTH_PATH};
use super::Dispatch;
use crate::backend::Backend;
use crate::error::DispatchError;

/// Calls a remote dispatch gateway over HTTP.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = crate::ai::http_client(Some(timeout));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Backends the gateway has credentials for.
    pub async fn health(&self) -> Result<Vec<Backend>, DispatchError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, HEALTH_PATH))
            .send()
            .await
            .map_err(transport)?;
        let health: Health = response.json().await.map_err(transport)?;
        Ok(health.backends)
    }
}

fn transport(e: reqwest::Error) -> DispatchError {
    DispatchError::Transport(e.to_string())
}

#[async_trait]
impl Dispatch for GatewayClient {
    async fn dispatch(&self, message: &str, target: Backend) -> Result<String, DispatchError> {
        let request = DispatchRequest {
            message: message.to_string(),
            target: target.as_str().to_string(),
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, CHAT_PATH))
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport)?;
        let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
            debug!(backend = %target, status, body = %text, "unparseable gateway reply");
            DispatchError::Transport(e.to_string())
        })?;
        envelope.into_result(status)
    }
}

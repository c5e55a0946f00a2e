//! Dispatch gateway.
//!
//! A single operation, `dispatch(message, target)`, routes one prompt to the
//! matching backend adapter. It is reachable in-process through [`Gateway`] and
//! over HTTP through [`http::router`]; [`client::GatewayClient`] is the HTTP
//! caller. Both sides implement [`Dispatch`], so the orchestrator does not care
//! which one it talks to.

pub mod client;
pub mod http;

pub use client::GatewayClient;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::ai::{BackendAdapter, ClaudeClient, OpenAIClient};
use crate::backend::Backend;
use crate::config::Config;
use crate::error::{DispatchError, ProviderError};

/// Send one prompt to one backend and get back its full answer.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, message: &str, target: Backend) -> Result<String, DispatchError>;
}

/// Routes dispatches to the configured adapters.
#[derive(Clone, Default)]
pub struct Gateway {
    claude: Option<Arc<dyn BackendAdapter>>,
    chatgpt: Option<Arc<dyn BackendAdapter>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under the backend it reports.
    pub fn with_adapter(mut self, adapter: Arc<dyn BackendAdapter>) -> Self {
        match adapter.backend() {
            Backend::Claude => self.claude = Some(adapter),
            Backend::ChatGpt => self.chatgpt = Some(adapter),
        }
        self
    }

    /// Build adapters for every backend that has an API key.
    pub fn from_config(config: &Config) -> Self {
        let timeout = config.request_timeout();
        let mut gateway = Self::new();

        match config.api_key(Backend::Claude) {
            Some(key) => {
                let client = ClaudeClient::new(key)
                    .with_base_url(&config.claude_base_url)
                    .with_model(&config.claude_model)
                    .with_timeout(timeout);
                gateway = gateway.with_adapter(Arc::new(client));
            }
            None => warn!("Claude API key not configured"),
        }

        match config.api_key(Backend::ChatGpt) {
            Some(key) => {
                let client = OpenAIClient::new(key)
                    .with_base_url(&config.openai_base_url)
                    .with_model(&config.openai_model)
                    .with_timeout(timeout);
                gateway = gateway.with_adapter(Arc::new(client));
            }
            None => warn!("OpenAI API key not configured"),
        }

        gateway
    }

    pub fn configured(&self) -> Vec<Backend> {
        Backend::ALL
            .into_iter()
            .filter(|b| self.adapter(*b).is_some())
            .collect()
    }

    fn adapter(&self, backend: Backend) -> Option<&Arc<dyn BackendAdapter>> {
        match backend {
            Backend::Claude => self.claude.as_ref(),
            Backend::ChatGpt => self.chatgpt.as_ref(),
        }
    }

    /// Dispatch with an untyped target, as received on the wire. The message
    /// is checked before the target.
    pub async fn dispatch_raw(&self, message: &str, target: &str) -> Result<String, DispatchError> {
        if message.trim().is_empty() {
            return Err(DispatchError::EmptyMessage);
        }
        let backend = Backend::from_tag(target)
            .ok_or_else(|| DispatchError::InvalidTarget(target.to_string()))?;
        self.dispatch(message, backend).await
    }
}

#[async_trait]
impl Dispatch for Gateway {
    async fn dispatch(&self, message: &str, target: Backend) -> Result<String, DispatchError> {
        if message.trim().is_empty() {
            return Err(DispatchError::EmptyMessage);
        }

        let adapter = self
            .adapter(target)
            .ok_or_else(|| ProviderError::not_configured(target))?;

        debug!(backend = %target, "dispatching");
        match adapter.generate(message).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(backend = %target, status = e.status_code, error = %e.message, "provider call failed");
                Err(e.into())
            }
        }
    }
}

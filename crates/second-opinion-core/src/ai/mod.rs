pub mod claude;
pub mod openai;

pub use claude::ClaudeClient;
pub use openai::OpenAIClient;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::backend::Backend;
use crate::error::ProviderError;

/// Returned when a provider answers without any extractable text.
pub const NO_RESPONSE: &str = "No response generated";

/// Uniform call contract over one model provider.
///
/// Adapters send a single context-free prompt and return the full completion.
/// They neither validate the prompt nor retry.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    fn backend(&self) -> Backend;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

pub(crate) fn http_client(timeout: Option<Duration>) -> Client {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, ?timeout, "HTTP client build failed, falling back to defaults");
        Client::new()
    })
}

#[derive(Deserialize)]
struct UpstreamErrorBody {
    error: UpstreamErrorDetail,
}

#[derive(Deserialize)]
struct UpstreamErrorDetail {
    message: String,
}

/// Turn a non-success provider reply into a `ProviderError`, preferring the
/// provider's own `error.message` when the body has one.
pub(crate) async fn upstream_error(label: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<UpstreamErrorBody>(&text) {
        Ok(body) => body.error.message,
        Err(_) if text.trim().is_empty() => format!("{} API error {}", label, status),
        Err(_) => format!("{} API error {}: {}", label, status, text),
    };
    ProviderError::new(message, Some(status.as_u16()))
}

pub(crate) fn malformed(label: &str, e: reqwest::Error) -> ProviderError {
    ProviderError::new(format!("Malformed {} response: {}", label, e), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_builds_with_timeout() {
        // Building must not panic with or without a timeout.
        let _ = http_client(Some(Duration::from_secs(5)));
        let _ = http_client(None);
    }
}

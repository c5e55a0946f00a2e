use thiserror::Error;

use crate::backend::Backend;

/// Status reported when a provider failure carries no status of its own.
pub const DEFAULT_STATUS: u16 = 500;

/// An upstream provider call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (status {status_code})")]
pub struct ProviderError {
    pub message: String,
    pub status_code: u16,
}

impl ProviderError {
    pub fn new(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status_code: status_code.unwrap_or(DEFAULT_STATUS),
        }
    }

    pub fn not_configured(backend: Backend) -> Self {
        Self::new(
            format!("{} API key not configured", backend.display_name()),
            Some(503),
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let status = if e.is_timeout() {
            Some(504)
        } else {
            e.status().map(|s| s.as_u16())
        };
        Self::new(e.to_string(), status)
    }
}

/// Failure of one dispatch, either at the gateway or on the way back from it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Message is required")]
    EmptyMessage,

    #[error("Invalid chatbot specified: {0:?}")]
    InvalidTarget(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The gateway reply could not be read as an envelope.
    #[error("Invalid response from server: {0}")]
    Transport(String),
}

impl DispatchError {
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::EmptyMessage | DispatchError::InvalidTarget(_) => 400,
            DispatchError::Provider(e) => e.status_code,
            DispatchError::Transport(_) => 502,
        }
    }

    /// Text placed in the `error` field of a failure envelope.
    pub fn envelope_message(&self) -> String {
        match self {
            DispatchError::EmptyMessage => "Message is required".to_string(),
            DispatchError::InvalidTarget(_) => "Invalid chatbot specified".to_string(),
            DispatchError::Provider(e) => e.message.clone(),
            DispatchError::Transport(m) => m.clone(),
        }
    }
}

/// Why the orchestrator refused a submission. Either way nothing changed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("still waiting for the previous submission")]
    Busy,
}

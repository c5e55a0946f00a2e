//! HTTP boundary of the dispatch gateway.
//!
//! One JSON endpoint (`POST /api/chat`) served with axum. Every reply is an
//! [`Envelope`]: `{response}` on success, `{error}` with a non-2xx status on
//! failure.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::Gateway;
use crate::backend::Backend;
use crate::error::{DispatchError, ProviderError};

pub const CHAT_PATH: &str = "/api/chat";
pub const HEALTH_PATH: &str = "/api/health";

/// Body of `POST /api/chat`. `chatbot` is accepted as an older name for `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "chatbot", deserialize_with = "any_tag")]
    pub target: String,
}

/// Accept a target of any JSON type. Non-strings keep their JSON text so they
/// fail as an unknown backend rather than as a malformed body.
fn any_tag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(tag) => tag,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Uniform reply of the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn success(text: String) -> Self {
        Self {
            response: Some(text),
            error: None,
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            response: None,
            error: Some(message),
        }
    }

    /// Collapse a received envelope and its HTTP status into one result. An
    /// `error` field wins over a `response` field, whatever the status.
    pub fn into_result(self, status: u16) -> Result<String, DispatchError> {
        let success = (200..300).contains(&status);
        match (self.response, self.error) {
            (_, Some(error)) => {
                let status = if success { None } else { Some(status) };
                Err(ProviderError::new(error, status).into())
            }
            (_, None) if !success => {
                Err(ProviderError::new("Failed to get response", Some(status)).into())
            }
            (Some(response), None) => Ok(response),
            (None, None) => Err(DispatchError::Transport(
                "reply has neither response nor error".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub ok: bool,
    pub backends: Vec<Backend>,
}

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route(CHAT_PATH, post(handle_chat))
        .route(HEALTH_PATH, get(handle_health))
        .with_state(gateway)
}

/// Serve the gateway until Ctrl+C.
pub async fn serve(gateway: Arc<Gateway>, addr: &str) -> anyhow::Result<()> {
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid gateway address {}: {}", addr, e))?;
    let listener = TcpListener::bind(socket_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, backends = ?gateway.configured(), "dispatch gateway listening");

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn handle_chat(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> (StatusCode, Json<Envelope>) {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected dispatch request");
            return (
                StatusCode::BAD_REQUEST,
                Json(Envelope::failure(rejection.body_text())),
            );
        }
    };

    match gateway.dispatch_raw(&request.message, &request.target).await {
        Ok(text) => {
            info!(backend = %request.target, "dispatch succeeded");
            (StatusCode::OK, Json(Envelope::success(text)))
        }
        Err(e) => {
            warn!(backend = %request.target, status = e.status_code(), error = %e, "dispatch failed");
            let status = StatusCode::from_u16(e.status_code())
                .ok()
                .filter(|s| !s.is_success())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(Envelope::failure(e.envelope_message())))
        }
    }
}

async fn handle_health(State(gateway): State<Arc<Gateway>>) -> Json<Health> {
    Json(Health {
        ok: true,
        backends: gateway.configured(),
    })
}

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use second_opinion_core::{Backend, BackendAdapter, ProviderError};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Adapter with a canned answer that records every prompt it receives.
pub struct FakeAdapter {
    backend: Backend,
    reply: Result<String, ProviderError>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeAdapter {
    pub fn ok(backend: Backend, text: &str) -> Arc<Self> {
        Arc::new(Self {
            backend,
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(backend: Backend, message: &str, status: u16) -> Arc<Self> {
        Arc::new(Self {
            backend,
            reply: Err(ProviderError::new(message, Some(status))),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl BackendAdapter for FakeAdapter {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

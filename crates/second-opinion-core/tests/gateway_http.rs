//! Dispatch gateway over HTTP, exercised with the gateway client and raw requests.

mod common;

use std::sync::Arc;

use axum::{http::StatusCode, routing::post, Router};
use second_opinion_core::gateway::http::router;
use second_opinion_core::{
    Backend, Dispatch, DispatchError, FailurePolicy, Gateway, GatewayClient, Orchestrator,
    PLACEHOLDER_TEXT,
};
use serde_json::{json, Value};

use common::{spawn_server, FakeAdapter};

async fn gateway_url(claude: Arc<FakeAdapter>, chatgpt: Arc<FakeAdapter>) -> String {
    let gateway = Gateway::new().with_adapter(claude).with_adapter(chatgpt);
    spawn_server(router(Arc::new(gateway))).await
}

async fn post_json(url: &str, body: &str) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", url))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn client_dispatch_success() {
    let claude = FakeAdapter::ok(Backend::Claude, "Hi Claude");
    let url = gateway_url(claude.clone(), FakeAdapter::ok(Backend::ChatGpt, "Hi GPT")).await;

    let client = GatewayClient::new(&url);
    assert_eq!(client.dispatch("hello", Backend::Claude).await.unwrap(), "Hi Claude");
    assert_eq!(client.dispatch("hello", Backend::ChatGpt).await.unwrap(), "Hi GPT");
    assert_eq!(claude.prompts.lock().unwrap().as_slice(), ["hello"]);
}

#[tokio::test]
async fn provider_failure_becomes_non_2xx_envelope() {
    let url = gateway_url(
        FakeAdapter::ok(Backend::Claude, "Hi Claude"),
        FakeAdapter::failing(Backend::ChatGpt, "Rate limit reached", 429),
    )
    .await;

    let (status, body) = post_json(&url, r#"{"message":"hello","target":"chatgpt"}"#).await;
    assert_eq!(status, 429);
    assert_eq!(body, json!({"error": "Rate limit reached"}));

    let err = GatewayClient::new(&url)
        .dispatch("hello", Backend::ChatGpt)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 429);
}

#[tokio::test]
async fn invalid_target_is_400() {
    let url = gateway_url(
        FakeAdapter::ok(Backend::Claude, "a"),
        FakeAdapter::ok(Backend::ChatGpt, "b"),
    )
    .await;

    let (status, body) = post_json(&url, r#"{"message":"hello","target":"gemini"}"#).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"error": "Invalid chatbot specified"}));

    let (status, _) = post_json(&url, r#"{"message":"hello"}"#).await;
    assert_eq!(status, 400);

    for body in [
        r#"{"message":"hello","target":5}"#,
        r#"{"message":"hello","target":["claude"]}"#,
    ] {
        let (status, reply) = post_json(&url, body).await;
        assert_eq!(status, 400);
        assert_eq!(reply, json!({"error": "Invalid chatbot specified"}));
    }
}

#[tokio::test]
async fn missing_message_is_400() {
    let claude = FakeAdapter::ok(Backend::Claude, "a");
    let url = gateway_url(claude.clone(), FakeAdapter::ok(Backend::ChatGpt, "b")).await;

    let (status, body) = post_json(&url, r#"{"message":"","target":"claude"}"#).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"error": "Message is required"}));
    assert!(claude.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn chatbot_field_name_is_accepted() {
    let url = gateway_url(
        FakeAdapter::ok(Backend::Claude, "Hi Claude"),
        FakeAdapter::ok(Backend::ChatGpt, "Hi GPT"),
    )
    .await;

    let (status, body) = post_json(&url, r#"{"message":"hello","chatbot":"chatgpt"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"response": "Hi GPT"}));
}

#[tokio::test]
async fn malformed_request_json_is_400_envelope() {
    let url = gateway_url(
        FakeAdapter::ok(Backend::Claude, "a"),
        FakeAdapter::ok(Backend::ChatGpt, "b"),
    )
    .await;

    let (status, body) = post_json(&url, "{oops").await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unconfigured_backend_is_503() {
    let gateway = Gateway::new().with_adapter(FakeAdapter::ok(Backend::Claude, "a"));
    let url = spawn_server(router(Arc::new(gateway))).await;

    let (status, body) = post_json(&url, r#"{"message":"hello","target":"chatgpt"}"#).await;
    assert_eq!(status, 503);
    assert_eq!(body, json!({"error": "ChatGPT API key not configured"}));
}

#[tokio::test]
async fn health_lists_configured_backends() {
    let gateway = Gateway::new().with_adapter(FakeAdapter::ok(Backend::ChatGpt, "b"));
    let url = spawn_server(router(Arc::new(gateway))).await;

    let backends = GatewayClient::new(&url).health().await.unwrap();
    assert_eq!(backends, vec![Backend::ChatGpt]);
}

#[tokio::test]
async fn unparseable_reply_is_transport_error() {
    let url = spawn_server(Router::new().route(
        "/api/chat",
        post(|| async { (StatusCode::OK, "<html>gateway timeout</html>") }),
    ))
    .await;

    let err = GatewayClient::new(&url)
        .dispatch("hello", Backend::Claude)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Transport(_)));
}

#[tokio::test]
async fn success_envelope_with_error_field_is_failure() {
    let url = spawn_server(Router::new().route(
        "/api/chat",
        post(|| async { (StatusCode::OK, r#"{"response":"Hi","error":"upstream hiccup"}"#) }),
    ))
    .await;

    let err = GatewayClient::new(&url)
        .dispatch("hello", Backend::Claude)
        .await
        .unwrap_err();
    assert_eq!(err.envelope_message(), "upstream hiccup");
}

#[tokio::test]
async fn orchestrator_over_http_both_succeed() {
    let url = gateway_url(
        FakeAdapter::ok(Backend::Claude, "Hi Claude"),
        FakeAdapter::ok(Backend::ChatGpt, "Hi GPT"),
    )
    .await;

    let mut orchestrator = Orchestrator::new(Arc::new(GatewayClient::new(&url)));
    orchestrator.submit("hello").unwrap();
    orchestrator.settle().await;

    let log: Vec<(Backend, &str)> = orchestrator
        .log()
        .messages()
        .iter()
        .map(|m| (m.backend(), m.text()))
        .collect();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0], (Backend::Claude, "hello"));
    assert!(log[1..].contains(&(Backend::Claude, "Hi Claude")));
    assert!(log[1..].contains(&(Backend::ChatGpt, "Hi GPT")));
}

#[tokio::test]
async fn orchestrator_over_http_one_fails() {
    let url = gateway_url(
        FakeAdapter::ok(Backend::Claude, "Hi Claude"),
        FakeAdapter::failing(Backend::ChatGpt, "Rate limit reached", 429),
    )
    .await;

    let mut orchestrator = Orchestrator::new(Arc::new(GatewayClient::new(&url)));
    orchestrator.submit("hello").unwrap();
    orchestrator.settle().await;

    let messages = orchestrator.log().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text(), PLACEHOLDER_TEXT);
    assert_eq!(messages[1].backend(), Backend::Claude);
    assert!(!messages.iter().any(|m| m.text().contains("Rate limit")));
}

#[tokio::test]
async fn orchestrator_over_http_per_backend_policy() {
    let url = gateway_url(
        FakeAdapter::ok(Backend::Claude, "Hi Claude"),
        FakeAdapter::failing(Backend::ChatGpt, "Rate limit reached", 429),
    )
    .await;

    let mut orchestrator = Orchestrator::new(Arc::new(GatewayClient::new(&url)))
        .with_policy(FailurePolicy::PerBackend);
    orchestrator.submit("hello").unwrap();
    orchestrator.settle().await;

    assert_eq!(orchestrator.log().len(), 3);
    let gpt = orchestrator.visible(Backend::ChatGpt);
    assert_eq!(gpt.last().unwrap().text(), PLACEHOLDER_TEXT);
    let claude = orchestrator.visible(Backend::Claude);
    assert_eq!(claude.last().unwrap().text(), "Hi Claude");
}

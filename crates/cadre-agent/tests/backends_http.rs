//! HTTP-level tests for the completion backends against a mock provider.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cadre_agent::backends::build_backend;
use cadre_agent::{
    CompletionBackend, CompletionGateway, CompletionRequest, LlmGateway, LlmProvider,
    ModelConfig,
};
use std::collections::BTreeMap;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model(provider: LlmProvider, base_url: &str) -> ModelConfig {
    ModelConfig {
        provider,
        model_id: "mock-model".to_string(),
        api_key: Some("test-key".to_string()),
        api_key_env: None,
        api_base_url: Some(base_url.to_string()),
        temperature: 0.0,
        max_tokens: 256,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_claude_backend_sends_system_and_parses_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "mock-model",
            "system": "You are a copywriter."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "Subject: Quick question"}]
        })))
        .mount(&server)
        .await;

    let backend = build_backend(model(LlmProvider::Claude, &server.uri())).unwrap();
    let text = backend
        .complete("You are a copywriter.", "Write an email")
        .await
        .unwrap();
    assert_eq!(text, "Subject: Quick question");
}

#[tokio::test]
async fn test_claude_backend_surfaces_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "type": "error",
            "error": {"type": "rate_limit_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = build_backend(model(LlmProvider::Claude, &server.uri())).unwrap();
    let err = backend.complete("sys", "prompt").await.unwrap_err();
    assert!(err.to_string().contains("429"), "unexpected error: {err}");
}

#[tokio::test]
async fn test_openai_backend_reads_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Ten keywords"}}]
        })))
        .mount(&server)
        .await;

    let backend = build_backend(model(LlmProvider::OpenAi, &server.uri())).unwrap();
    assert_eq!(
        backend.complete("sys", "research").await.unwrap(),
        "Ten keywords"
    );
}

#[tokio::test]
async fn test_gateway_reports_blank_content_as_success_for_caller_to_reject() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  "}}]
        })))
        .mount(&server)
        .await;

    let mut configs = BTreeMap::new();
    configs.insert("groq".to_string(), model(LlmProvider::Groq, &server.uri()));
    let gateway = LlmGateway::from_configs(&configs).unwrap();

    let resp = gateway
        .complete(CompletionRequest::new("groq", "Analyst", "sys", "task"))
        .await;
    assert!(resp.success);
    assert!(resp.into_content().is_err());
}

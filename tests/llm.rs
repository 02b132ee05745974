//! Ollama client behaviour against a mocked model service.

use std::time::Duration;

use aerosense::config::ModelConfig;
use aerosense::llm::{LanguageModel, ModelError, OllamaClient};
use httpmock::prelude::*;
use serde_json::json;

fn config_for(server: &MockServer) -> ModelConfig {
    ModelConfig {
        base_url: server.base_url(),
        model: "test-model".to_string(),
        timeout: Duration::from_secs(2),
        max_attempts: 1,
    }
}

#[tokio::test]
async fn completes_against_generate_endpoint() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .json_body_partial(r#"{"model": "test-model", "stream": false}"#);
            then.status(200)
                .json_body(json!({"response": "Levels are steady and healthy."}));
        })
        .await;

    let client = OllamaClient::new(config_for(&server)).unwrap();
    let text = client.complete("Summarize the report.").await.unwrap();

    mock.assert_async().await;
    assert_eq!(text, "Levels are steady and healthy.");
}

#[tokio::test]
async fn server_error_surfaces_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(500).body("model crashed");
        })
        .await;

    let client = OllamaClient::new(config_for(&server)).unwrap();
    let err = client.complete("prompt").await.unwrap_err();
    assert!(matches!(err, ModelError::Status { status: 500, .. }));
}

#[tokio::test]
async fn stalled_service_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200)
                .delay(Duration::from_secs(5))
                .json_body(json!({"response": "too late"}));
        })
        .await;

    let config = ModelConfig {
        timeout: Duration::from_millis(200),
        ..config_for(&server)
    };
    let client = OllamaClient::new(config).unwrap();
    let err = client.complete("prompt").await.unwrap_err();
    assert!(matches!(err, ModelError::Timeout { .. }));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).body("not json at all");
        })
        .await;

    let client = OllamaClient::new(config_for(&server)).unwrap();
    let err = client.complete("prompt").await.unwrap_err();
    assert!(matches!(err, ModelError::Decode(_)));
}

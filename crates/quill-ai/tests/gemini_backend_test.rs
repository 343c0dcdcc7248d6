//! HTTP-level tests for the Gemini backend against a mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quill_ai::GeminiBackend;
use quill_core::{Error, GenerationBackend};

#[tokio::test]
async fn test_generate_returns_candidate_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "summarize this"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [
                {"content": {"parts": [{"text": "- point one\n- point two"}]}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(server.uri(), "test-key");
    let text = backend
        .generate("gemini-2.0-flash", "summarize this")
        .await
        .unwrap();
    assert_eq!(text, "- point one\n- point two");
}

#[tokio::test]
async fn test_generate_joins_multiple_parts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [
                {"content": {"parts": [{"text": "first "}, {"text": "second"}]}}
            ]
        })))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(server.uri(), "test-key");
    let text = backend.generate("gemini-2.0-flash", "p").await.unwrap();
    assert_eq!(text, "first second");
}

#[tokio::test]
async fn test_rate_limit_response_carries_retry_hint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted (e.g. check quota).",
                "status": "RESOURCE_EXHAUSTED",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.RetryInfo",
                    "retryDelay": "30s"
                }]
            }
        })))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(server.uri(), "test-key");
    match backend.generate("gemini-2.0-flash", "p").await {
        Err(Error::AiRateLimited {
            message,
            retry_after,
        }) => {
            assert_eq!(retry_after.as_deref(), Some("30s"));
            assert!(message.contains("30s"));
        }
        other => panic!("Expected AiRateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_inference_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"message": "Internal error encountered.", "status": "INTERNAL"}
        })))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(server.uri(), "test-key");
    match backend.generate("gemini-2.0-flash", "p").await {
        Err(Error::Inference(msg)) => assert!(msg.contains("Internal error")),
        other => panic!("Expected Inference, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_candidates_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(server.uri(), "test-key");
    assert!(matches!(
        backend.generate("gemini-2.0-flash", "p").await,
        Err(Error::Inference(_))
    ));
}

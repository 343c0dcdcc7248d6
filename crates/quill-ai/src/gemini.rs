//! Gemini generative backend implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use quill_core::defaults::GEMINI_BASE_URL;
use quill_core::{Error, GenerationBackend, Result};

/// Placeholder value shipped in sample .env files; treated as no credential.
const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

/// Gemini REST backend (`generateContent` endpoint).
///
/// One instance is constructed at startup from configuration and shared by
/// reference; it holds only a reqwest client and connection settings.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiBackend {
    /// Create a backend against a specific endpoint.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Create from environment variables.
    ///
    /// - `GEMINI_API_KEY`: service credential (may be absent; the gateway
    ///   fails fast before any request if so)
    /// - `GEMINI_BASE_URL`: endpoint override, mainly for tests
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| GEMINI_BASE_URL.to_string());
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        Self::new(base_url, api_key)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Deserialize, Default)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

/// Pull the `RetryInfo.retryDelay` hint out of a Gemini error body, if the
/// provider attached one.
fn retry_delay_hint(details: &[serde_json::Value]) -> Option<String> {
    details
        .iter()
        .find(|d| {
            d.get("@type")
                .and_then(|t| t.as_str())
                .is_some_and(|t| t.contains("RetryInfo"))
        })
        .and_then(|d| d.get("retryDelay"))
        .and_then(|v| v.as_str())
        .map(String::from)
}

/// Translate a non-success HTTP response into the error taxonomy.
///
/// Quota rejections become `AiRateLimited` with the provider's retry-delay
/// hint preserved; everything else is a plain inference failure.
fn classify_error(status: StatusCode, body: &str) -> Error {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let detail = parsed.error;

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || detail.status == "RESOURCE_EXHAUSTED"
        || detail.message.contains("quota");

    if rate_limited {
        let retry_after = retry_delay_hint(&detail.details);
        let message = match &retry_after {
            Some(delay) => format!("AI limit reached. Please wait {} before retrying.", delay),
            None => "AI limit reached. Please wait a minute before trying again.".to_string(),
        };
        return Error::AiRateLimited {
            message,
            retry_after,
        };
    }

    let message = if detail.message.is_empty() {
        body.chars().take(200).collect()
    } else {
        detail.message
    };
    Error::Inference(format!("Gemini returned {}: {}", status, message))
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn has_credential(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != PLACEHOLDER_API_KEY
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let start = Instant::now();

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        let text: String = result
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Inference(
                "Model returned no candidates".to_string(),
            ));
        }

        debug!(
            subsystem = "ai",
            component = "gemini",
            op = "generate",
            model,
            prompt_len = prompt.len(),
            response_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_credential_rejects_empty_and_placeholder() {
        assert!(!GeminiBackend::new(GEMINI_BASE_URL, "").has_credential());
        assert!(!GeminiBackend::new(GEMINI_BASE_URL, PLACEHOLDER_API_KEY).has_credential());
        assert!(GeminiBackend::new(GEMINI_BASE_URL, "AIza-real-key").has_credential());
    }

    #[test]
    fn test_retry_delay_hint_found() {
        let details = vec![
            json!({"@type": "type.googleapis.com/google.rpc.QuotaFailure"}),
            json!({
                "@type": "type.googleapis.com/google.rpc.RetryInfo",
                "retryDelay": "30s"
            }),
        ];
        assert_eq!(retry_delay_hint(&details), Some("30s".to_string()));
    }

    #[test]
    fn test_retry_delay_hint_absent() {
        let details = vec![json!({"@type": "type.googleapis.com/google.rpc.QuotaFailure"})];
        assert_eq!(retry_delay_hint(&details), None);
    }

    #[test]
    fn test_classify_429_with_delay() {
        let body = json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted",
                "status": "RESOURCE_EXHAUSTED",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.RetryInfo",
                    "retryDelay": "30s"
                }]
            }
        })
        .to_string();

        match classify_error(StatusCode::TOO_MANY_REQUESTS, &body) {
            Error::AiRateLimited {
                message,
                retry_after,
            } => {
                assert_eq!(retry_after.as_deref(), Some("30s"));
                assert!(message.contains("30s"));
            }
            other => panic!("Expected AiRateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_429_without_delay() {
        match classify_error(StatusCode::TOO_MANY_REQUESTS, "{}") {
            Error::AiRateLimited {
                message,
                retry_after,
            } => {
                assert!(retry_after.is_none());
                assert!(message.contains("wait a minute"));
            }
            other => panic!("Expected AiRateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_quota_message_without_429_status() {
        let body = json!({
            "error": {"message": "quota exceeded for model", "status": "FAILED_PRECONDITION"}
        })
        .to_string();
        assert!(matches!(
            classify_error(StatusCode::FORBIDDEN, &body),
            Error::AiRateLimited { .. }
        ));
    }

    #[test]
    fn test_classify_server_error() {
        let body = json!({"error": {"message": "internal", "status": "INTERNAL"}}).to_string();
        match classify_error(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            Error::Inference(msg) => assert!(msg.contains("internal")),
            other => panic!("Expected Inference, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_unparseable_body() {
        match classify_error(StatusCode::BAD_GATEWAY, "<html>upstream</html>") {
            Error::Inference(msg) => assert!(msg.contains("502")),
            other => panic!("Expected Inference, got {:?}", other),
        }
    }
}

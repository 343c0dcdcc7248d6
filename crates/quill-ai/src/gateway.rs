//! Summary gateway: ordered multi-model fallback over a generation backend.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use quill_core::defaults::{AI_ATTEMPT_TIMEOUT_SECS, FALLBACK_MODELS};
use quill_core::{Error, GenerationBackend, Result};

/// Build the ordered candidate list: operator override first (when set and
/// non-empty), then the fixed fallback models.
pub fn candidate_models(override_model: Option<String>) -> Vec<String> {
    let mut models = Vec::new();
    if let Some(m) = override_model.filter(|m| !m.is_empty()) {
        models.push(m);
    }
    models.extend(FALLBACK_MODELS.iter().map(|m| (*m).to_string()));
    models
}

/// Outcome of walking the candidate list.
enum FallbackOutcome {
    Success { model: String, text: String },
    Exhausted(Vec<(String, Error)>),
}

/// Obtains a generated summary, tolerating model unavailability.
///
/// Candidates are tried strictly in order with a hard per-attempt timeout;
/// the first success wins. Fallback is sequential so a quota failure on one
/// model does not also burn quota on the next unless the first actually
/// failed.
pub struct SummaryGateway {
    backend: Arc<dyn GenerationBackend>,
    candidates: Vec<String>,
    attempt_timeout: Duration,
}

impl SummaryGateway {
    /// Create a gateway over a backend with an explicit candidate list.
    pub fn new(backend: Arc<dyn GenerationBackend>, candidates: Vec<String>) -> Self {
        Self {
            backend,
            candidates,
            attempt_timeout: Duration::from_secs(AI_ATTEMPT_TIMEOUT_SECS),
        }
    }

    /// Create from environment: `GEMINI_MODEL` as the candidate override,
    /// `QUILL_AI_TIMEOUT_SECS` as the per-attempt timeout.
    pub fn from_env(backend: Arc<dyn GenerationBackend>) -> Self {
        let gateway = Self::new(backend, candidate_models(std::env::var("GEMINI_MODEL").ok()));
        match std::env::var("QUILL_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(secs) => gateway.with_attempt_timeout(Duration::from_secs(secs)),
            None => gateway,
        }
    }

    /// Override the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// The configured candidate list, in attempt order.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Generate a summary for `prompt`.
    ///
    /// Fails fast with `AiUnavailable` before any network attempt when the
    /// backend has no usable credential. When every candidate fails, the
    /// *last* candidate's error is surfaced, since it preserves any structured
    /// rate-limit detail the provider attached.
    pub async fn summarize(&self, prompt: &str) -> Result<String> {
        if !self.backend.has_credential() {
            return Err(Error::AiUnavailable(
                "no API key configured".to_string(),
            ));
        }

        match self.try_candidates(prompt).await {
            FallbackOutcome::Success { model, text } => {
                info!(
                    subsystem = "ai",
                    component = "gateway",
                    op = "summarize",
                    model = %model,
                    response_len = text.len(),
                    "Summary generated"
                );
                Ok(text)
            }
            FallbackOutcome::Exhausted(mut failures) => {
                error!(
                    subsystem = "ai",
                    component = "gateway",
                    op = "summarize",
                    attempts = failures.len(),
                    "All candidate models failed"
                );
                Err(failures
                    .pop()
                    .map(|(_, err)| err)
                    .unwrap_or_else(|| {
                        Error::AiUnavailable("no candidate models configured".to_string())
                    }))
            }
        }
    }

    async fn try_candidates(&self, prompt: &str) -> FallbackOutcome {
        let mut failures: Vec<(String, Error)> = Vec::new();

        for model in &self.candidates {
            info!(
                subsystem = "ai",
                component = "gateway",
                model = %model,
                "Attempting candidate model"
            );

            let attempt =
                tokio::time::timeout(self.attempt_timeout, self.backend.generate(model, prompt))
                    .await;

            match attempt {
                Ok(Ok(text)) => {
                    return FallbackOutcome::Success {
                        model: model.clone(),
                        text,
                    }
                }
                Ok(Err(err)) => {
                    warn!(
                        subsystem = "ai",
                        component = "gateway",
                        model = %model,
                        error = %err,
                        "Candidate model failed"
                    );
                    failures.push((model.clone(), err));
                }
                Err(_) => {
                    warn!(
                        subsystem = "ai",
                        component = "gateway",
                        model = %model,
                        timeout_secs = self.attempt_timeout.as_secs(),
                        "Candidate model timed out"
                    );
                    failures.push((model.clone(), Error::AiTimeout));
                }
            }
        }

        FallbackOutcome::Exhausted(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted per-model behavior for gateway tests.
    enum Script {
        Succeed(&'static str),
        FailTransport,
        FailRateLimited(&'static str),
        Hang,
    }

    struct ScriptedBackend {
        credential: bool,
        scripts: HashMap<String, Script>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(scripts: Vec<(&str, Script)>) -> Self {
            Self {
                credential: true,
                scripts: scripts
                    .into_iter()
                    .map(|(m, s)| (m.to_string(), s))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn without_credential(mut self) -> Self {
            self.credential = false;
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn generate(&self, model: &str, _prompt: &str) -> Result<String> {
            self.calls.lock().unwrap().push(model.to_string());
            match self.scripts.get(model) {
                Some(Script::Succeed(text)) => Ok((*text).to_string()),
                Some(Script::FailTransport) => {
                    Err(Error::Inference("connection refused".to_string()))
                }
                Some(Script::FailRateLimited(delay)) => Err(Error::AiRateLimited {
                    message: format!("AI limit reached. Please wait {} before retrying.", delay),
                    retry_after: Some((*delay).to_string()),
                }),
                Some(Script::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("hang script should be cancelled by the attempt timeout")
                }
                None => panic!("unscripted model: {}", model),
            }
        }
    }

    fn gateway_over(backend: Arc<ScriptedBackend>, models: &[&str]) -> SummaryGateway {
        SummaryGateway::new(
            backend,
            models.iter().map(|m| (*m).to_string()).collect(),
        )
    }

    fn fallback_list() -> Vec<String> {
        FALLBACK_MODELS.iter().map(|m| (*m).to_string()).collect()
    }

    #[test]
    fn test_candidate_models_override_first() {
        let models = candidate_models(Some("gemini-custom".to_string()));
        assert_eq!(models[0], "gemini-custom");
        assert_eq!(models[1..].to_vec(), fallback_list());
    }

    #[test]
    fn test_candidate_models_empty_override_ignored() {
        assert_eq!(candidate_models(Some(String::new())), fallback_list());
        assert_eq!(candidate_models(None), fallback_list());
    }

    #[tokio::test]
    async fn test_first_success_stops_fallback() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ("m1", Script::Succeed("summary one")),
            ("m2", Script::Succeed("summary two")),
        ]));
        let gateway = gateway_over(backend.clone(), &["m1", "m2"]);

        let text = gateway.summarize("prompt").await.unwrap();
        assert_eq!(text, "summary one");
        assert_eq!(backend.calls(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_fallback_reaches_third_model() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ("m1", Script::FailTransport),
            ("m2", Script::FailTransport),
            ("m3", Script::Succeed("- point one\n- point two")),
        ]));
        let gateway = gateway_over(backend.clone(), &["m1", "m2", "m3"]);

        let text = gateway.summarize("prompt").await.unwrap();
        assert_eq!(text, "- point one\n- point two");
        assert_eq!(backend.calls(), vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_exhausted_surfaces_last_error_with_retry_hint() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ("m1", Script::FailTransport),
            ("m2", Script::FailRateLimited("30s")),
        ]));
        let gateway = gateway_over(backend.clone(), &["m1", "m2"]);

        match gateway.summarize("prompt").await {
            Err(Error::AiRateLimited { retry_after, .. }) => {
                assert_eq!(retry_after.as_deref(), Some("30s"));
            }
            other => panic!("Expected AiRateLimited, got {:?}", other),
        }
        assert_eq!(backend.calls(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_timeout_moves_to_next_candidate() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ("slow", Script::Hang),
            ("fast", Script::Succeed("rescued")),
        ]));
        let gateway = gateway_over(backend.clone(), &["slow", "fast"])
            .with_attempt_timeout(Duration::from_millis(50));

        let text = gateway.summarize("prompt").await.unwrap();
        assert_eq!(text, "rescued");
        assert_eq!(backend.calls(), vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_all_timeouts_yield_ai_timeout() {
        let backend = Arc::new(ScriptedBackend::new(vec![("slow", Script::Hang)]));
        let gateway = gateway_over(backend.clone(), &["slow"])
            .with_attempt_timeout(Duration::from_millis(50));

        assert!(matches!(
            gateway.summarize("prompt").await,
            Err(Error::AiTimeout)
        ));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_attempt() {
        let backend = Arc::new(
            ScriptedBackend::new(vec![("m1", Script::Succeed("unused"))]).without_credential(),
        );
        let gateway = gateway_over(backend.clone(), &["m1"]);

        assert!(matches!(
            gateway.summarize("prompt").await,
            Err(Error::AiUnavailable(_))
        ));
        assert!(backend.calls().is_empty());
    }
}

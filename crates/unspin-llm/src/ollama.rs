//! Ollama-compatible provider implementation.
//!
//! [`OllamaProvider`] talks to a local Ollama-style HTTP endpoint via the
//! non-streaming `/api/generate` operation. The service runs on loopback
//! and needs no authentication.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{GenerateRequest, GenerateResponse};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// A provider backed by an Ollama-compatible HTTP endpoint.
pub struct OllamaProvider {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl OllamaProvider {
    /// Create a provider for the default loopback endpoint.
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Create a provider for a custom endpoint.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// Returns the generate endpoint URL.
    fn generate_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/api/generate")
    }

    /// Check whether the service is up and responding.
    pub async fn is_healthy(&self) -> bool {
        let base = self.base_url.trim_end_matches('/');
        match self
            .http
            .get(format!("{base}/api/tags"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        debug!(
            model = %request.model,
            prompt_chars = request.prompt.chars().count(),
            "sending generate request"
        );

        let response = self
            .http
            .post(self.generate_url())
            .json(request)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 {
                return Err(ProviderError::ModelNotFound(format!(
                    "model '{}': {}",
                    request.model, body
                )));
            }

            warn!(status = status.as_u16(), body = %body, "generate request failed");
            return Err(ProviderError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        let envelope: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse envelope: {e}")))?;

        debug!(
            model = %envelope.model,
            response_chars = envelope.response.chars().count(),
            "generate response received"
        );

        Ok(envelope.response)
    }
}

impl std::fmt::Debug for OllamaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaProvider")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OllamaProvider {
        OllamaProvider::with_base_url(server.uri(), Duration::from_secs(5))
    }

    #[test]
    fn generate_url_strips_trailing_slash() {
        let provider =
            OllamaProvider::with_base_url("http://127.0.0.1:11434/", Duration::from_secs(1));
        assert_eq!(provider.generate_url(), "http://127.0.0.1:11434/api/generate");
    }

    #[tokio::test]
    async fn generate_returns_response_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "phi3:mini",
                "response": "{\"neutralized\": \"ok\"}",
                "done": true
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let request = GenerateRequest::new("phi3:mini", "rewrite", 0.3);
        let text = provider.generate(&request).await.unwrap();
        assert!(text.contains("neutralized"));
    }

    #[tokio::test]
    async fn generate_maps_404_to_model_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let request = GenerateRequest::new("ghost:model", "rewrite", 0.3);
        let err = provider.generate(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::ModelNotFound(_)));
        assert!(err.to_string().contains("ghost:model"));
    }

    #[tokio::test]
    async fn generate_maps_500_to_request_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let request = GenerateRequest::new("phi3:mini", "rewrite", 0.3);
        let err = provider.generate(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::RequestFailed(_)));
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn generate_rejects_bad_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let request = GenerateRequest::new("phi3:mini", "rewrite", 0.3);
        let err = provider.generate(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn health_check_against_mock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": []
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert!(provider.is_healthy().await);
    }

    #[tokio::test]
    async fn health_check_unreachable_is_false() {
        // Port 9 (discard) is almost certainly closed.
        let provider =
            OllamaProvider::with_base_url("http://127.0.0.1:9", Duration::from_secs(1));
        assert!(!provider.is_healthy().await);
    }
}

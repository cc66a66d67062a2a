//! Exponential backoff retry logic for provider calls.
//!
//! [`RetryPolicy`] wraps any [`Provider`] and automatically retries
//! transient failures (timeouts, connection errors, HTTP 5xx). Permanent
//! failures like a missing model return immediately.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::GenerateRequest;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3).
    pub max_retries: u32,
    /// Base delay between retries (default: 500ms).
    pub base_delay: Duration,
    /// Maximum delay between retries (default: 10 seconds).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Determines whether a [`ProviderError`] should be retried.
pub fn is_retryable(err: &ProviderError) -> bool {
    match err {
        ProviderError::Timeout => true,
        ProviderError::Http(_) => true,
        ProviderError::RequestFailed(msg) => {
            msg.starts_with("HTTP 500")
                || msg.starts_with("HTTP 502")
                || msg.starts_with("HTTP 503")
                || msg.starts_with("HTTP 504")
        }
        ProviderError::ModelNotFound(_)
        | ProviderError::InvalidResponse(_)
        | ProviderError::Json(_) => false,
    }
}

/// Delay for attempt `n` (0-indexed): `min(base * 2^n, max)`.
pub fn compute_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = 2u64.saturating_pow(attempt);
    let base_ms = config.base_delay.as_millis() as u64;
    let raw_ms = base_ms.saturating_mul(exp);
    Duration::from_millis(raw_ms.min(config.max_delay.as_millis() as u64))
}

/// A provider wrapper that retries transient failures.
pub struct RetryPolicy<P> {
    inner: P,
    config: RetryConfig,
}

impl<P: Provider> RetryPolicy<P> {
    /// Wrap a provider with retry logic.
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Returns a reference to the inner provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Provider> Provider for RetryPolicy<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.generate(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!(
                            provider = %self.inner.name(),
                            attempt,
                            "request succeeded after retry"
                        );
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if !is_retryable(&err) || attempt == self.config.max_retries {
                        return Err(err);
                    }

                    let delay = compute_delay(&self.config, attempt);
                    warn!(
                        provider = %self.inner.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or(ProviderError::RequestFailed(
            "retry loop exhausted without error".into(),
        )))
    }
}

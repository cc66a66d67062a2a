//! The core [`Provider`] trait for neutralization generate calls.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::GenerateRequest;

/// A provider that can execute a single generate request.
///
/// Implementations handle the protocol details for a specific service
/// endpoint. The main implementation is
/// [`OllamaProvider`](crate::ollama::OllamaProvider); tests substitute
/// scripted providers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Execute a generate request and return the raw response text.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`](crate::error::ProviderError) if the
    /// request fails due to network issues, a missing model, or an
    /// unparseable response envelope.
    async fn generate(&self, request: &GenerateRequest) -> Result<String>;
}

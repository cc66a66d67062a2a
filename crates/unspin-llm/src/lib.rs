//! Language-model service adapter for unspin.
//!
//! This crate wraps the external neutralization service behind a small
//! [`Provider`] trait. It is a standalone library with no dependency on
//! the rest of the workspace.
//!
//! # Architecture
//!
//! - [`Provider`] trait defines the single generate operation
//! - [`OllamaProvider`] implements it for an Ollama-style local endpoint
//! - [`RetryPolicy`] wraps any provider with exponential-backoff retries
//! - [`extract`] recovers a JSON object from free-form model prose

pub mod error;
pub mod extract;
pub mod ollama;
pub mod provider;
pub mod retry;
pub mod types;

pub use error::{ProviderError, Result};
pub use extract::parse_embedded_object;
pub use ollama::OllamaProvider;
pub use provider::Provider;
pub use retry::{RetryConfig, RetryPolicy};
pub use types::{GenerateOptions, GenerateRequest, GenerateResponse};

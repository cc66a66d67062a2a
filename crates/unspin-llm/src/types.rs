//! Request and response types for the generate call.
//!
//! These mirror the Ollama `/api/generate` wire format, which the local
//! neutralization service speaks.

use serde::{Deserialize, Serialize};

/// A generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "phi3:mini").
    pub model: String,

    /// The full prompt: system instruction followed by the user text.
    pub prompt: String,

    /// Whether to stream the response. Always false here.
    pub stream: bool,

    /// Sampling options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

impl GenerateRequest {
    /// Create a non-streaming request with a temperature.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
            options: Some(GenerateOptions {
                temperature: Some(temperature),
                num_predict: None,
            }),
        }
    }
}

/// Sampling options for a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

/// A generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub model: String,

    /// The generated text, expected to contain a JSON object somewhere.
    pub response: String,

    pub done: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u32>,
}

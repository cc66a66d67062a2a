//! Provider error types for unspin-llm.

use thiserror::Error;

/// Errors that can occur when calling the neutralization service.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The HTTP request to the service failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The requested model does not exist on the service.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The service returned a response that could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request timed out.
    #[error("timeout")]
    Timeout,

    /// An HTTP-level error from reqwest.
    #[error("http error: {0}")]
    Http(reqwest::Error),

    /// A JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Http(err)
        }
    }
}

/// A convenience type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_request_failed() {
        let err = ProviderError::RequestFailed("connection reset".into());
        assert_eq!(err.to_string(), "request failed: connection reset");
    }

    #[test]
    fn display_model_not_found() {
        let err = ProviderError::ModelNotFound("phi9:mega".into());
        assert_eq!(err.to_string(), "model not found: phi9:mega");
    }

    #[test]
    fn display_timeout() {
        assert_eq!(ProviderError::Timeout.to_string(), "timeout");
    }

    #[test]
    fn json_error_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: ProviderError = serde_err.into();
        assert!(err.to_string().starts_with("json error:"));
    }

    #[test]
    fn result_alias_works() {
        let ok: Result<i32> = Ok(42);
        assert!(ok.is_ok());
        let err: Result<i32> = Err(ProviderError::Timeout);
        assert!(err.is_err());
    }
}

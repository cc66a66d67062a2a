//! Error types for the unspin engine.
//!
//! [`EngineError`] is the top-level error type. Provider-level failures
//! live in `unspin-llm` and never surface here directly: the
//! neutralization client recovers them with a local fallback, so
//! `ServiceUnavailable` conditions are absorbed before they reach a
//! caller.

use thiserror::Error;

/// Top-level error type for the engine.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// The fragment failed the length/shape constraint and never entered
    /// the pipeline. Surfaced synchronously at submission.
    #[error("input rejected: {reason}")]
    InputRejected {
        /// Why the fragment was refused.
        reason: String,
    },

    /// The engine is disabled; all submissions are refused with no state
    /// change.
    #[error("engine disabled")]
    Disabled,

    /// An unexpected failure inside detection/scoring/caching. The
    /// fragment is marked failed and may be resubmitted.
    #[error("processing failed: {reason}")]
    ProcessingFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The engine's work queue has shut down.
    #[error("engine shut down")]
    Shutdown,

    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Underlying I/O error (config persistence).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_rejected_display() {
        let err = EngineError::InputRejected {
            reason: "too short".into(),
        };
        assert_eq!(err.to_string(), "input rejected: too short");
    }

    #[test]
    fn disabled_display() {
        assert_eq!(EngineError::Disabled.to_string(), "engine disabled");
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io_err.into();
        assert!(matches!(err, EngineError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: EngineError = json_err.into();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn result_alias_works() {
        fn refuse() -> Result<()> {
            Err(EngineError::Disabled)
        }
        assert!(refuse().is_err());
    }
}

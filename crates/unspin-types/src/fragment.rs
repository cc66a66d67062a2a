//! Fragments, per-fragment lifecycle state, and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::technique::Technique;

/// Opaque caller-supplied identifier used for dedupe and result routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentHandle(pub String);

impl FragmentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FragmentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FragmentHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FragmentHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One unit of input text submitted for classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    /// Raw UTF-8 text of the fragment.
    pub text: String,

    /// Handle used to route the eventual result back to its origin.
    pub handle: FragmentHandle,
}

impl Fragment {
    pub fn new(text: impl Into<String>, handle: impl Into<FragmentHandle>) -> Self {
        Self {
            text: text.into(),
            handle: handle.into(),
        }
    }
}

/// Per-fragment lifecycle marker.
///
/// `Pending -> InFlight -> {Done | Failed}`. A handle enters the seen map
/// at `Pending`; `Failed` removes it so resubmission can retry, `Done`
/// keeps it so duplicate submissions are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    InFlight,
    Done,
    Failed,
}

/// Severity score plus the components it was derived from.
///
/// Invariant: `severity == 0` exactly when the technique set was empty;
/// otherwise `severity` is in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Overall severity, 0-10.
    pub severity: u8,
    /// Surface-signal intensity, 1-4.
    pub intensity: u8,
    /// Technique-count centrality, 1-3.
    pub centrality: u8,
}

impl ScoreResult {
    /// The score for a fragment with no detected techniques.
    pub fn clean() -> Self {
        Self {
            severity: 0,
            intensity: 1,
            centrality: 1,
        }
    }
}

/// The terminal result for a successfully processed fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeutralizedFragment {
    /// The original submitted text.
    pub original: String,

    /// Rewritten text with manipulative framing removed.
    pub neutralized: String,

    /// Detected techniques, deduplicated.
    pub techniques: Vec<Technique>,

    /// Locally computed severity, 0-10.
    pub severity: u8,

    /// Whether this result was served from the cache.
    pub from_cache: bool,
}

/// Exactly one of these is delivered per accepted fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FragmentOutcome {
    /// Processing completed; the fragment has a final rendering.
    Done(NeutralizedFragment),

    /// Processing failed; the original text stays visible (fail open).
    Failed {
        /// Human-readable description of what went wrong.
        reason: String,
    },
}

/// A cached (original, neutralized, techniques, severity) tuple.
///
/// Records older than the configured TTL are logically absent even while
/// physically present; the cache enforces this on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Hex-encoded content fingerprint of `original`.
    pub fingerprint: String,
    pub original: String,
    pub neutralized: String,
    pub techniques: Vec<Technique>,
    pub severity: u8,
    pub created_at: DateTime<Utc>,
    /// Observability only; never affects eviction order.
    pub hit_count: u64,
}

/// Running cache counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_from_str_and_display() {
        let h = FragmentHandle::from("post-42");
        assert_eq!(h.as_str(), "post-42");
        assert_eq!(h.to_string(), "post-42");
    }

    #[test]
    fn clean_score_components() {
        let s = ScoreResult::clean();
        assert_eq!(s.severity, 0);
        assert_eq!(s.intensity, 1);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let outcome = FragmentOutcome::Failed {
            reason: "boom".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"failed\""));
        assert!(json.contains("boom"));
    }

    #[test]
    fn neutralized_fragment_roundtrip() {
        let frag = NeutralizedFragment {
            original: "WAKE UP!!!".into(),
            neutralized: "Wake up.".into(),
            techniques: vec![Technique::MisleadingFormat],
            severity: 3,
            from_cache: false,
        };
        let json = serde_json::to_string(&frag).unwrap();
        assert!(json.contains("Misleading Format"));
        let back: NeutralizedFragment = serde_json::from_str(&json).unwrap();
        assert_eq!(back.severity, 3);
        assert_eq!(back.techniques, vec![Technique::MisleadingFormat]);
    }

    #[test]
    fn processing_state_snake_case() {
        let json = serde_json::to_string(&ProcessingState::InFlight).unwrap();
        assert_eq!(json, "\"in_flight\"");
    }
}

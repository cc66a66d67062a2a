//! The fixed enumeration of rhetorical-manipulation techniques.
//!
//! Technique names cross a trust boundary: the external language model
//! reports them as free-form strings and routinely varies spelling,
//! casing, and separators. [`Technique::parse_loose`] normalizes those
//! variants back onto the closed set; anything unrecognized is dropped
//! by the caller rather than invented.

use serde::{Deserialize, Serialize};

/// A named rhetorical-manipulation pattern.
///
/// The set is closed by design: severity scoring assigns a vulnerability
/// weight per variant, and an open set would make the score formula
/// unstable under model hallucination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Technique {
    #[serde(rename = "Fear Appeal")]
    FearAppeal,
    #[serde(rename = "Anger Outrage")]
    AngerOutrage,
    #[serde(rename = "Shame Guilt")]
    ShameGuilt,
    #[serde(rename = "False Urgency")]
    FalseUrgency,
    #[serde(rename = "False Certainty")]
    FalseCertainty,
    #[serde(rename = "Scapegoating")]
    Scapegoating,
    #[serde(rename = "Bandwagon Pressure")]
    BandwagonPressure,
    #[serde(rename = "FOMO")]
    Fomo,
    #[serde(rename = "Toxic Positivity")]
    ToxicPositivity,
    #[serde(rename = "Misleading Format")]
    MisleadingFormat,
}

impl Technique {
    /// All techniques, in a fixed order.
    pub const ALL: [Technique; 10] = [
        Technique::FearAppeal,
        Technique::AngerOutrage,
        Technique::ShameGuilt,
        Technique::FalseUrgency,
        Technique::FalseCertainty,
        Technique::Scapegoating,
        Technique::BandwagonPressure,
        Technique::Fomo,
        Technique::ToxicPositivity,
        Technique::MisleadingFormat,
    ];

    /// The canonical wire name (matches the serde rename).
    pub fn as_str(&self) -> &'static str {
        match self {
            Technique::FearAppeal => "Fear Appeal",
            Technique::AngerOutrage => "Anger Outrage",
            Technique::ShameGuilt => "Shame Guilt",
            Technique::FalseUrgency => "False Urgency",
            Technique::FalseCertainty => "False Certainty",
            Technique::Scapegoating => "Scapegoating",
            Technique::BandwagonPressure => "Bandwagon Pressure",
            Technique::Fomo => "FOMO",
            Technique::ToxicPositivity => "Toxic Positivity",
            Technique::MisleadingFormat => "Misleading Format",
        }
    }

    /// Parse a technique name leniently.
    ///
    /// Comparison ignores case and every non-alphanumeric character, so
    /// `"fear-appeal"`, `"FearAppeal"`, and `"Fear Appeal"` all resolve to
    /// [`Technique::FearAppeal`]. Returns `None` for names outside the set.
    pub fn parse_loose(name: &str) -> Option<Technique> {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return None;
        }
        Technique::ALL
            .into_iter()
            .find(|t| normalize(t.as_str()) == wanted)
    }
}

impl std::fmt::Display for Technique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase and strip non-alphanumeric characters.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// One detected technique with optional supporting evidence.
///
/// Evidence is a short snippet or signal description used for display
/// and debugging; it does not participate in equality, so a set of
/// matches deduplicates on the technique name alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueMatch {
    /// The detected technique.
    pub technique: Technique,

    /// Substring or signal description that triggered the match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl TechniqueMatch {
    /// Create a match without evidence.
    pub fn new(technique: Technique) -> Self {
        Self {
            technique,
            evidence: None,
        }
    }

    /// Create a match with an evidence snippet.
    pub fn with_evidence(technique: Technique, evidence: impl Into<String>) -> Self {
        Self {
            technique,
            evidence: Some(evidence.into()),
        }
    }
}

impl PartialEq for TechniqueMatch {
    fn eq(&self, other: &Self) -> bool {
        self.technique == other.technique
    }
}

impl Eq for TechniqueMatch {}

impl std::hash::Hash for TechniqueMatch {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.technique.hash(state);
    }
}

//! Neutralization via the external model, with a local fallback.
//!
//! The external service is asked to rewrite a fragment and name the
//! techniques it used. Its answer is treated as hostile input: the JSON
//! is dug out of surrounding prose, the technique list is coerced onto
//! the closed enum, and the self-reported severity is discarded in
//! favor of the local formula. When the call fails in any way (timeout,
//! transport error, unusable response) a deterministic local rewrite
//! takes over, so every input gets a result.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use unspin_llm::{GenerateRequest, Provider, parse_embedded_object};
use unspin_types::{EngineConfig, Technique};

use crate::scorer;

/// Instruction sent ahead of every fragment.
const NEUTRALIZE_INSTRUCTION: &str = "\
You rewrite text to remove emotional manipulation while preserving factual content.

Rewrite the text below so that it states the same information calmly and neutrally. \
Remove shouting, alarm symbols, loaded framing, and pressure tactics. Do not add \
opinions or new facts.

Respond with ONLY a JSON object in this exact shape:
{\"neutralized\": \"<rewritten text>\", \"techniques\": [\"<technique name>\", ...], \"severity\": <1-10>}

Valid technique names: Fear Appeal, Anger Outrage, Shame Guilt, False Urgency, \
False Certainty, Scapegoating, Bandwagon Pressure, FOMO, Toxic Positivity, \
Misleading Format.

Text to rewrite:
";

/// A finished neutralization, from the service or the local fallback.
#[derive(Debug, Clone)]
pub struct Neutralization {
    pub neutralized: String,
    pub techniques: Vec<Technique>,
    /// Always computed locally via the scoring formula.
    pub severity: u8,
}

/// Client for the external neutralization service.
pub struct Neutralizer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl Neutralizer {
    pub fn new(provider: Arc<dyn Provider>, config: &EngineConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.request_timeout(),
        }
    }

    /// Neutralize `text`, falling back locally on any failure.
    ///
    /// Never returns an error; the deterministic fallback guarantees a
    /// result for every input.
    pub async fn neutralize(&self, text: &str) -> Neutralization {
        let prompt = format!("{NEUTRALIZE_INSTRUCTION}{text}");
        let request = GenerateRequest::new(&self.model, prompt, self.temperature);

        let raw = match tokio::time::timeout(self.timeout, self.provider.generate(&request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                warn!(provider = %self.provider.name(), error = %err, "generate failed, using local rewrite");
                return self.fallback(text);
            }
            Err(_) => {
                warn!(
                    provider = %self.provider.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "generate timed out, using local rewrite"
                );
                return self.fallback(text);
            }
        };

        match parse_response(text, &raw) {
            Some(result) => result,
            None => {
                warn!(
                    response_chars = raw.chars().count(),
                    "unusable response payload, using local rewrite"
                );
                self.fallback(text)
            }
        }
    }

    /// The deterministic local rewrite used when the service fails.
    pub fn fallback(&self, text: &str) -> Neutralization {
        let (neutralized, changed) = local_rewrite(text);
        let techniques = if changed {
            vec![Technique::MisleadingFormat]
        } else {
            Vec::new()
        };
        let severity = scorer::score(text, &techniques).severity;
        debug!(changed, "local fallback rewrite applied");
        Neutralization {
            neutralized,
            techniques,
            severity,
        }
    }
}

impl std::fmt::Debug for Neutralizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neutralizer")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Validate a raw service response into a [`Neutralization`].
///
/// Returns `None` when no usable object can be extracted or it lacks a
/// `neutralized` string. The response's own severity field, if any, is
/// ignored; severity comes from the local formula over the coerced
/// technique names.
fn parse_response(original: &str, raw: &str) -> Option<Neutralization> {
    let value = parse_embedded_object(raw)?;

    let neutralized = value.get("neutralized")?.as_str()?.trim().to_string();
    if neutralized.is_empty() {
        return None;
    }

    let techniques = coerce_techniques(value.get("techniques"));
    let severity = scorer::score(original, &techniques).severity;

    Some(Neutralization {
        neutralized,
        techniques,
        severity,
    })
}

/// Coerce the service's `techniques` field onto the closed enum.
///
/// Accepts an array of strings, an array of `{"name": ...}` objects, or
/// a bare string. Unknown names and other shapes are dropped; the
/// result is deduplicated in first-seen order.
fn coerce_techniques(value: Option<&serde_json::Value>) -> Vec<Technique> {
    let mut out: Vec<Technique> = Vec::new();
    let mut push = |name: &str| {
        if let Some(technique) = Technique::parse_loose(name) {
            if !out.contains(&technique) {
                out.push(technique);
            }
        }
    };

    match value {
        Some(serde_json::Value::Array(items)) => {
            for item in items {
                match item {
                    serde_json::Value::String(name) => push(name),
                    serde_json::Value::Object(map) => {
                        if let Some(name) = map.get("name").and_then(|v| v.as_str()) {
                            push(name);
                        }
                    }
                    _ => {}
                }
            }
        }
        Some(serde_json::Value::String(name)) => push(name),
        _ => {}
    }

    out
}

// ── Local rewrite ────────────────────────────────────────────────────

/// Alarm glyphs removed by the fallback rewrite.
const STRIP_GLYPHS: &[char] = &['🚨', '🔥', '⚠', '❗', '‼', '⛔', '💥', '😱', '\u{fe0f}'];

/// Deterministic de-escalation of `text`.
///
/// Strips alarm glyphs, collapses runs of `!`/`?` to a single mark, and
/// lowercases shouted tokens (re-capitalizing at sentence starts).
/// Returns the rewritten text and whether anything changed.
pub fn local_rewrite(text: &str) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut changed = false;

    // Pass 1: drop glyphs and collapse punctuation runs.
    let mut last_terminator: Option<char> = None;
    for c in text.chars() {
        if STRIP_GLYPHS.contains(&c) {
            changed = true;
            continue;
        }
        if c == '!' || c == '?' {
            if last_terminator == Some(c) {
                changed = true;
                continue;
            }
            last_terminator = Some(c);
        } else {
            last_terminator = None;
        }
        out.push(c);
    }

    // Pass 2: fold shouted tokens, keeping sentence capitalization.
    let chars: Vec<char> = out.chars().collect();
    let mut folded = String::with_capacity(out.len());
    let mut at_sentence_start = true;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_alphabetic() {
            let mut j = i;
            while j < chars.len() && chars[j].is_alphabetic() {
                j += 1;
            }
            let run = &chars[i..j];
            if run.len() >= 3 && run.iter().all(|c| c.is_uppercase()) {
                changed = true;
                for (k, rc) in run.iter().enumerate() {
                    if k == 0 && at_sentence_start {
                        folded.push(*rc);
                    } else {
                        folded.extend(rc.to_lowercase());
                    }
                }
            } else {
                folded.extend(run.iter());
            }
            at_sentence_start = false;
            i = j;
        } else {
            if matches!(c, '.' | '!' | '?') {
                at_sentence_start = true;
            } else if !c.is_whitespace() {
                at_sentence_start = false;
            }
            folded.push(c);
            i += 1;
        }
    }

    (folded, changed)
}

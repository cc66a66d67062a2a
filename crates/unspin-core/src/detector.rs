//! Layered technique detection.
//!
//! Detection runs cheapest-first. Layer one scans for surface agitation
//! signals (shouted tokens, stacked punctuation, alarm glyphs, urgency
//! vocabulary) and acts as a fast reject: a fragment with no surface
//! signal is declared clean without touching the pattern layer. Layer
//! two runs compiled regex patterns over flagged fragments. Layer three
//! attributes every firing signal and pattern to a [`Technique`] and
//! deduplicates the result.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use unspin_types::{Technique, TechniqueMatch};

// ── Surface signals ──────────────────────────────────────────────────

/// Urgency and alarm vocabulary checked case-insensitively as
/// substrings. Kept short on purpose; the pattern layer handles the
/// subtler phrasings.
const URGENCY_LEXICON: &[&str] = &[
    "act now",
    "wake up",
    "hurry",
    "urgent",
    "warning",
    "alert",
    "breaking",
    "emergency",
    "last chance",
    "don't wait",
    "before it's too late",
    "time is running out",
    "destroy",
    "catastrophe",
    "disaster",
    "danger",
    "threat",
];

/// Glyphs that exist to raise alarm rather than to describe anything.
const ALARM_GLYPHS: &[char] = &['🚨', '🔥', '⚠', '❗', '‼', '⛔', '💥', '😱'];

/// Counts of the four surface signal families in one fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceSignals {
    /// Tokens of three or more letters written entirely in uppercase.
    pub caps_tokens: usize,
    /// `!` and `?` marks that appear inside runs of two or more.
    pub repeated_punct: usize,
    /// Occurrences of alarm glyphs.
    pub alarm_glyphs: usize,
    /// Case-insensitive hits against the urgency lexicon.
    pub urgency_hits: usize,
}

impl SurfaceSignals {
    /// True when no family fired at all.
    pub fn is_quiet(&self) -> bool {
        self.caps_tokens == 0
            && self.repeated_punct == 0
            && self.alarm_glyphs == 0
            && self.urgency_hits == 0
    }

    /// The largest single-family count.
    pub fn max_count(&self) -> usize {
        self.caps_tokens
            .max(self.repeated_punct)
            .max(self.alarm_glyphs)
            .max(self.urgency_hits)
    }
}

/// Scan `text` for surface agitation signals.
pub fn surface_signals(text: &str) -> SurfaceSignals {
    let mut signals = SurfaceSignals::default();

    for token in text.split_whitespace() {
        let letters: Vec<char> = token.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.len() >= 3 && letters.iter().all(|c| c.is_uppercase()) {
            signals.caps_tokens += 1;
        }
    }

    let mut run = 0usize;
    for c in text.chars() {
        if c == '!' || c == '?' {
            run += 1;
        } else {
            if run >= 2 {
                signals.repeated_punct += run;
            }
            run = 0;
        }
    }
    if run >= 2 {
        signals.repeated_punct += run;
    }

    signals.alarm_glyphs = text.chars().filter(|c| ALARM_GLYPHS.contains(c)).count();

    let lowered = text.to_lowercase();
    signals.urgency_hits = URGENCY_LEXICON
        .iter()
        .map(|term| lowered.matches(term).count())
        .sum();

    signals
}

// ── Pattern layer ────────────────────────────────────────────────────

/// One compiled pattern and the technique it attributes to.
struct PatternRule {
    regex: Regex,
    technique: Technique,
}

fn rule(pattern: &str, technique: Technique) -> PatternRule {
    PatternRule {
        // Patterns are fixed at compile time; a failure here is a
        // programming error caught by the detector tests.
        regex: Regex::new(pattern).unwrap_or_else(|e| panic!("bad detector pattern: {e}")),
        technique,
    }
}

static PATTERN_RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    vec![
        rule(
            r"(?i)\b(destroy(ed|ing)?|terrifying|deadly|wipe[sd]? out|be afraid|dangerous|catastroph\w*|disaster\w*)\b",
            Technique::FearAppeal,
        ),
        rule(
            r"(?i)\b(outrage(ous)?|disgrace(ful)?|betray(al|ed|ing)?|sickening|infuriating|disgusting)\b",
            Technique::AngerOutrage,
        ),
        rule(
            r"(?i)(shame on you|you should be ashamed|if you really cared|how dare you)",
            Technique::ShameGuilt,
        ),
        // Identity attacks shame the reader out of the out-group.
        rule(
            r"(?i)\b(real|true)\s+\w+\s+(would|could)\s+never\b",
            Technique::ShameGuilt,
        ),
        rule(r"(?i)\bno true \w+\b", Technique::ShameGuilt),
        rule(
            r"(?i)(act now|last chance|before it'?s too late|time is running out|don'?t wait|hurry)",
            Technique::FalseUrgency,
        ),
        // Imperative emotional triggers.
        rule(
            r"(?i)(wake up|open your eyes|share (this )?before|spread the word)",
            Technique::FalseUrgency,
        ),
        rule(
            r"(?i)\b(everyone knows|nobody|no one|always|never|every single|all of them)\b",
            Technique::FalseCertainty,
        ),
        // False authority reads as unearned certainty.
        rule(
            r"(?i)(experts agree|scientists say|studies show|doctors (hate|don'?t want)|the science is settled)",
            Technique::FalseCertainty,
        ),
        rule(
            r"(?i)(they (want|are trying|don'?t want you) to|it'?s their fault|blame (the|them)\b)",
            Technique::Scapegoating,
        ),
        rule(
            r"(?i)(everyone is|everybody is|everyone else|join the millions|millions of people)",
            Technique::BandwagonPressure,
        ),
        rule(
            r"(?i)(don'?t miss out|missing out|limited time|only a few left|while supplies last|exclusive offer)",
            Technique::Fomo,
        ),
        rule(
            r"(?i)(good vibes only|just stay positive|just be grateful|no negativity|happiness is a choice)",
            Technique::ToxicPositivity,
        ),
    ]
});

// ── Attribution ──────────────────────────────────────────────────────

/// Detect manipulation techniques in `text`.
///
/// Returns one [`TechniqueMatch`] per distinct technique, each carrying
/// the first evidence that fired for it. A fragment with no surface
/// signal at all short-circuits to an empty result.
pub fn detect(text: &str) -> Vec<TechniqueMatch> {
    let signals = surface_signals(text);
    if signals.is_quiet() {
        return Vec::new();
    }

    let mut matches: Vec<TechniqueMatch> = Vec::new();
    let mut push = |technique: Technique, evidence: String| {
        if !matches.iter().any(|m| m.technique == technique) {
            matches.push(TechniqueMatch::with_evidence(technique, evidence));
        }
    };

    for rule in PATTERN_RULES.iter() {
        if let Some(found) = rule.regex.find(text) {
            push(rule.technique, found.as_str().to_string());
        }
    }

    // Surface formatting signals attribute to Misleading Format even
    // when no pattern fires.
    if signals.caps_tokens > 0 {
        push(Technique::MisleadingFormat, "all-caps emphasis".into());
    }
    if signals.repeated_punct > 0 {
        push(Technique::MisleadingFormat, "repeated punctuation".into());
    }
    if signals.alarm_glyphs > 0 {
        push(Technique::MisleadingFormat, "alarm glyphs".into());
    }

    debug!(
        techniques = matches.len(),
        caps = signals.caps_tokens,
        punct = signals.repeated_punct,
        glyphs = signals.alarm_glyphs,
        urgency = signals.urgency_hits,
        "detection complete"
    );

    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_text_has_no_signals() {
        let signals = surface_signals("This could be concerning, but let's look closer.");
        assert!(signals.is_quiet());
    }

    #[test]
    fn caps_tokens_need_three_letters() {
        let signals = surface_signals("WAKE UP and GO");
        // "UP" and "GO" are too short to count as shouting.
        assert_eq!(signals.caps_tokens, 1);
    }

    #[test]
    fn repeated_punct_counts_marks_in_runs() {
        let signals = surface_signals("What?! Really??? Fine.");
        // "?!" contributes 2, "???" contributes 3, "." contributes 0.
        assert_eq!(signals.repeated_punct, 5);
        assert_eq!(surface_signals("One! Two? Three.").repeated_punct, 0);
    }

    #[test]
    fn alarm_glyphs_counted() {
        let signals = surface_signals("🚨🚨 breaking news 🔥");
        assert_eq!(signals.alarm_glyphs, 3);
        assert!(signals.urgency_hits >= 1);
    }

    #[test]
    fn clean_text_fast_rejects() {
        assert!(detect("The committee will review the proposal next week.").is_empty());
    }

    #[test]
    fn pattern_layer_skipped_without_surface_signal() {
        // "everyone knows" would match the certainty pattern, but the
        // fragment carries no surface agitation so it never gets there.
        assert!(detect("everyone knows the cafe closes early on sundays").is_empty());
    }

    #[test]
    fn agitated_fragment_attributes_techniques() {
        let matches = detect("WAKE UP!!! They want to DESTROY everything we love!!!");
        let techniques: Vec<Technique> = matches.iter().map(|m| m.technique).collect();
        assert!(techniques.contains(&Technique::FalseUrgency));
        assert!(techniques.contains(&Technique::Scapegoating));
        assert!(techniques.contains(&Technique::FearAppeal));
        assert!(techniques.contains(&Technique::MisleadingFormat));
    }

    #[test]
    fn matches_are_deduplicated() {
        let matches = detect("URGENT!!! act now, last chance, don't wait!!!");
        let urgency = matches
            .iter()
            .filter(|m| m.technique == Technique::FalseUrgency)
            .count();
        assert_eq!(urgency, 1);
    }

    #[test]
    fn evidence_records_the_trigger() {
        let matches = detect("BREAKING: scientists say it is all a disaster!!");
        let fear = matches
            .iter()
            .find(|m| m.technique == Technique::FearAppeal)
            .unwrap();
        assert_eq!(fear.evidence.as_deref(), Some("disaster"));
    }

    #[test]
    fn glyph_only_fragment_is_misleading_format() {
        let matches = detect("new phone dropped 🔥🔥🔥 looks fine to me");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].technique, Technique::MisleadingFormat);
    }
}

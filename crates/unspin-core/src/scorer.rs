//! Severity scoring.
//!
//! Severity is derived locally and never taken from the external
//! service: per technique, `raw = intensity + centrality + vulnerability`
//! is pushed through a fixed non-linear mapping, and the overall
//! severity is the maximum across techniques. The jump in the mapping
//! at the top end (raw 9 maps to 8, raw 10 to 10) is a design constant.

use unspin_types::{ScoreResult, Technique};

use crate::detector::surface_signals;

/// Map a raw total in `3..=10` onto the final per-technique severity.
const SEVERITY_MAP: [u8; 8] = [1, 2, 3, 4, 5, 6, 8, 10];

/// Surface intensity of `text`, 1 to 4.
///
/// Each signal family (caps tokens, repeated punctuation, alarm glyphs,
/// urgency hits) maps its count onto a level; the fragment's intensity
/// is the loudest single family, not a sum.
pub fn intensity(text: &str) -> u8 {
    let signals = surface_signals(text);
    family_level(signals.caps_tokens)
        .max(family_level(signals.repeated_punct))
        .max(family_level(signals.alarm_glyphs))
        .max(family_level(signals.urgency_hits))
}

fn family_level(count: usize) -> u8 {
    match count {
        0 => 1,
        1 => 2,
        2..=4 => 3,
        _ => 4,
    }
}

/// How many distinct techniques are in play, compressed to 1 to 3.
pub fn centrality(technique_count: usize) -> u8 {
    match technique_count {
        0 | 1 => 1,
        2 | 3 => 2,
        _ => 3,
    }
}

/// Fixed per-technique vulnerability weight, 1 to 3.
///
/// Primal-fear techniques weigh 3, identity and belonging techniques 2,
/// everything else 1.
pub fn vulnerability(technique: Technique) -> u8 {
    match technique {
        Technique::FearAppeal | Technique::ShameGuilt | Technique::Scapegoating => 3,
        Technique::AngerOutrage
        | Technique::FalseUrgency
        | Technique::BandwagonPressure
        | Technique::Fomo => 2,
        Technique::FalseCertainty | Technique::ToxicPositivity | Technique::MisleadingFormat => 1,
    }
}

/// Score `text` against the given technique set.
///
/// An empty technique set always yields severity 0; otherwise severity
/// is in `1..=10`.
pub fn score(text: &str, techniques: &[Technique]) -> ScoreResult {
    let intensity = intensity(text);
    let centrality = centrality(techniques.len());

    let severity = techniques
        .iter()
        .map(|&t| {
            let raw = intensity + centrality + vulnerability(t);
            SEVERITY_MAP[usize::from(raw) - 3]
        })
        .max()
        .unwrap_or(0);

    ScoreResult {
        severity,
        intensity,
        centrality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calm_text_is_intensity_one() {
        assert_eq!(intensity("This could be concerning"), 1);
    }

    #[test]
    fn intensity_takes_the_loudest_family() {
        // One caps token (level 2) but six stacked marks (level 4).
        assert_eq!(intensity("WAKE up!!! now!!!"), 4);
        // Two families at one hit each still max out at level 2.
        assert_eq!(intensity("the URGENT memo arrived"), 2);
        assert_eq!(intensity("the BUDGET memo arrived"), 2);
    }

    #[test]
    fn centrality_buckets() {
        assert_eq!(centrality(0), 1);
        assert_eq!(centrality(1), 1);
        assert_eq!(centrality(2), 2);
        assert_eq!(centrality(3), 2);
        assert_eq!(centrality(4), 3);
        assert_eq!(centrality(9), 3);
    }

    #[test]
    fn vulnerability_table() {
        assert_eq!(vulnerability(Technique::FearAppeal), 3);
        assert_eq!(vulnerability(Technique::ShameGuilt), 3);
        assert_eq!(vulnerability(Technique::Scapegoating), 3);
        assert_eq!(vulnerability(Technique::FalseUrgency), 2);
        assert_eq!(vulnerability(Technique::Fomo), 2);
        assert_eq!(vulnerability(Technique::MisleadingFormat), 1);
        assert_eq!(vulnerability(Technique::ToxicPositivity), 1);
    }

    #[test]
    fn empty_set_scores_zero() {
        let result = score("This could be concerning", &[]);
        assert_eq!(result.severity, 0);
        assert_eq!(result.intensity, 1);
    }

    #[test]
    fn agitated_fragment_scores_high() {
        // Intensity 4 (six stacked marks), centrality 2 (two techniques),
        // vulnerability 3 for Fear Appeal: raw 9 maps to 8.
        let result = score(
            "WAKE UP!!! They want to DESTROY everything!!!",
            &[Technique::FearAppeal, Technique::FalseUrgency],
        );
        assert_eq!(result.intensity, 4);
        assert_eq!(result.centrality, 2);
        assert!((8..=10).contains(&result.severity));
        assert_eq!(result.severity, 8);
    }

    #[test]
    fn mapping_jump_at_the_top() {
        // raw 9 -> 8 and raw 10 -> 10, never 9.
        let loud = "DROP EVERYTHING!!! ACT NOW!!! DANGER!!!";
        let nine = score(loud, &[Technique::FearAppeal, Technique::ShameGuilt]);
        assert_eq!(nine.severity, 8);
        let ten = score(
            loud,
            &[
                Technique::FearAppeal,
                Technique::ShameGuilt,
                Technique::Scapegoating,
                Technique::FalseUrgency,
            ],
        );
        assert_eq!(ten.severity, 10);
    }

    #[test]
    fn monotonic_in_technique_count() {
        let text = "WARNING!! something is off";
        let mut previous = 0;
        let pool = [
            Technique::MisleadingFormat,
            Technique::FalseCertainty,
            Technique::ToxicPositivity,
        ];
        for n in 1..=pool.len() {
            let severity = score(text, &pool[..n]).severity;
            assert!(severity >= previous);
            previous = severity;
        }
    }

    #[test]
    fn single_mild_technique_scores_low() {
        // Intensity 2, centrality 1, vulnerability 1: raw 4 maps to 2.
        let result = score("the BUDGET memo arrived", &[Technique::MisleadingFormat]);
        assert_eq!(result.severity, 2);
    }
}

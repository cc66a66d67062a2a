//! JSON extraction and repair for free-form model output.
//!
//! The neutralization service is asked to answer with a JSON object, but
//! small local models frequently wrap it in prose, markdown fences, or
//! leave trailing commas and truncated structures. This module pulls the
//! first balanced-brace object out of the surrounding text and applies a
//! lightweight repair pass before handing it to `serde_json`. It is not a
//! full JSON parser; it targets the failure modes actually observed in
//! small-model responses.

/// Parse the first JSON object embedded in `input`.
///
/// Steps, in order:
///
/// 1. Strip markdown code fences.
/// 2. Slice from the first `{` to its matching `}` (string-aware); a
///    truncated object runs to end of input.
/// 3. Try `serde_json` as-is, then retry after removing trailing commas
///    and closing truncated structures.
///
/// Returns `None` when no object can be recovered.
pub fn parse_embedded_object(input: &str) -> Option<serde_json::Value> {
    let stripped = strip_markdown_fences(input);
    let candidate = extract_braced(&stripped)?;

    // Fast path: the slice is already valid.
    if let Ok(value) = serde_json::from_str(candidate) {
        return Some(value);
    }

    let repaired = close_truncated(&fix_trailing_commas(candidate));
    serde_json::from_str(&repaired).ok()
}

/// Remove markdown code fences from around JSON content.
fn strip_markdown_fences(input: &str) -> String {
    let trimmed = input.trim();

    let after_open = if let Some(stripped) = trimmed.strip_prefix("```json") {
        stripped
    } else if let Some(stripped) = trimmed.strip_prefix("```") {
        stripped
    } else {
        return trimmed.to_string();
    };

    let after_open = after_open.strip_prefix('\n').unwrap_or(after_open);

    let before_close = if let Some(stripped) = after_open.trim_end().strip_suffix("```") {
        stripped.trim_end()
    } else {
        after_open
    };

    before_close.to_string()
}

/// Slice from the first `{` to its matching close brace.
///
/// Braces inside string literals do not count. If the object never
/// closes (truncated output), the slice runs to the end of the input so
/// the repair pass can balance it.
fn extract_braced(input: &str) -> Option<&str> {
    let start = find_object_start(input)?;
    let bytes = &input[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in bytes.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&bytes[..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    // Truncated: return everything from the opening brace.
    Some(bytes)
}

/// Byte offset of the first `{` in the input.
fn find_object_start(input: &str) -> Option<usize> {
    input.find('{')
}

/// Remove trailing commas before `]` and `}`, respecting string literals.
fn fix_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut result = String::with_capacity(len);
    let mut in_string = false;
    let mut escape_next = false;
    let mut i = 0;

    while i < len {
        let c = chars[i];

        if escape_next {
            result.push(c);
            escape_next = false;
            i += 1;
            continue;
        }

        if c == '\\' && in_string {
            result.push(c);
            escape_next = true;
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = !in_string;
            result.push(c);
            i += 1;
            continue;
        }

        if in_string {
            result.push(c);
            i += 1;
            continue;
        }

        if c == ',' {
            let mut j = i + 1;
            while j < len && chars[j].is_whitespace() {
                j += 1;
            }
            if j < len && (chars[j] == ']' || chars[j] == '}') {
                i += 1;
                continue;
            }
        }

        result.push(c);
        i += 1;
    }

    result
}

/// Append missing closers (and an unterminated string quote) to balance
/// the structure.
fn close_truncated(input: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match c {
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    if !in_string && stack.is_empty() {
        return input.to_string();
    }

    let mut result = input.to_string();
    if in_string {
        result.push('"');
    }
    for closer in stack.into_iter().rev() {
        result.push(closer);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object() {
        let value = parse_embedded_object(r#"{"neutralized": "ok"}"#).unwrap();
        assert_eq!(value["neutralized"], "ok");
    }

    #[test]
    fn object_inside_prose() {
        let input = r#"Sure! Here is the result: {"neutralized": "calm text", "severity": 2} Hope that helps."#;
        let value = parse_embedded_object(input).unwrap();
        assert_eq!(value["neutralized"], "calm text");
        assert_eq!(value["severity"], 2);
    }

    #[test]
    fn fenced_object() {
        let input = "```json\n{\"neutralized\": \"ok\", \"techniques\": [\"FOMO\"]}\n```";
        let value = parse_embedded_object(input).unwrap();
        assert_eq!(value["techniques"][0], "FOMO");
    }

    #[test]
    fn trailing_comma_repaired() {
        let input = r#"{"neutralized": "ok", "techniques": ["Fear Appeal",],}"#;
        let value = parse_embedded_object(input).unwrap();
        assert_eq!(value["techniques"][0], "Fear Appeal");
    }

    #[test]
    fn truncated_object_closed() {
        let input = r#"{"neutralized": "the model ran out of tok"#;
        let value = parse_embedded_object(input).unwrap();
        assert_eq!(value["neutralized"], "the model ran out of tok");
    }

    #[test]
    fn nested_truncation_closed() {
        let input = r#"{"neutralized": "ok", "techniques": ["Fear Appeal", "False"#;
        let value = parse_embedded_object(input).unwrap();
        assert_eq!(value["techniques"][0], "Fear Appeal");
    }

    #[test]
    fn brace_in_string_ignored() {
        let input = r#"{"neutralized": "use { and } carefully", "severity": 1}"#;
        let value = parse_embedded_object(input).unwrap();
        assert_eq!(value["neutralized"], "use { and } carefully");
    }

    #[test]
    fn first_object_wins() {
        let input = r#"{"a": 1} {"b": 2}"#;
        let value = parse_embedded_object(input).unwrap();
        assert_eq!(value["a"], 1);
        assert!(value.get("b").is_none());
    }

    #[test]
    fn no_object_yields_none() {
        assert!(parse_embedded_object("no json here at all").is_none());
        assert!(parse_embedded_object("").is_none());
    }

    #[test]
    fn escaped_quotes_survive() {
        let input = r#"{"neutralized": "she said \"calm down\""}"#;
        let value = parse_embedded_object(input).unwrap();
        assert_eq!(value["neutralized"], r#"she said "calm down""#);
    }
}

//! Content fingerprints for cache keying.
//!
//! Two fragments with byte-identical text always produce the same
//! fingerprint, so a repeated fragment hits the cache regardless of
//! where it was seen. The digest is keyed on text alone; handles and
//! configuration never feed into it.

use std::fmt;

/// A 256-bit content digest of fragment text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Lowercase hex rendering, suitable for persistence and logs.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in &self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Fingerprint the exact bytes of `text`.
pub fn fingerprint(text: &str) -> Fingerprint {
    Fingerprint(*blake3::hash(text.as_bytes()).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_identical_fingerprint() {
        assert_eq!(fingerprint("hello world"), fingerprint("hello world"));
    }

    #[test]
    fn whitespace_changes_the_fingerprint() {
        assert_ne!(fingerprint("hello world"), fingerprint("hello  world"));
        assert_ne!(fingerprint("hello"), fingerprint("hello "));
    }

    #[test]
    fn hex_is_64_lowercase_chars() {
        let hex = fingerprint("x").to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn display_matches_hex() {
        let fp = fingerprint("sample");
        assert_eq!(fp.to_string(), fp.to_hex());
    }
}

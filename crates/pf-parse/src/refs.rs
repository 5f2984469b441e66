//! Reference extraction (§4.4.1): two ordered regexes, run case-insensitive,
//! uppercased and de-duplicated, preserving first-seen order.

use once_cell::sync::Lazy;
use regex::Regex;

// Sub-item / module-output form: V1.3, M57.2, ...
static DOTTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[VCSM]\d+\.\d+").unwrap());

// Simple form: V1, C2, S4, F1, I2, R57 — but not the head of a dotted form.
static SIMPLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[VCSFIR]\d+(?!\.\d)").unwrap());

/// Extract every reference token from a formula string, in the order the
/// two passes specify: dotted forms first, then simple forms. Results are
/// uppercased and de-duplicated, first occurrence wins.
pub fn extract_references(formula: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for m in DOTTED.find_iter(formula) {
        let tok = m.as_str().to_ascii_uppercase();
        if seen.insert(tok.clone()) {
            out.push(tok);
        }
    }
    for m in SIMPLE.find_iter(formula) {
        let tok = m.as_str().to_ascii_uppercase();
        if seen.insert(tok.clone()) {
            out.push(tok);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_and_dotted() {
        let refs = extract_references("V1.3 + v1 * R57 - M2.1");
        assert_eq!(refs, vec!["V1.3", "M2.1", "V1", "R57"]);
    }

    #[test]
    fn dedupes_preserving_first_seen() {
        let refs = extract_references("R1 + R1 + R1");
        assert_eq!(refs, vec!["R1"]);
    }

    #[test]
    fn no_double_match_on_dotted_head() {
        // "V1" inside "V1.3" must not also be picked up by the simple regex.
        let refs = extract_references("V1.3");
        assert_eq!(refs, vec!["V1.3"]);
    }

    #[test]
    fn case_insensitive_and_uppercased() {
        let refs = extract_references("c2 + f1");
        assert_eq!(refs, vec!["C2", "F1"]);
    }
}

//! Context-pattern extraction method.
//!
//! Regex templates capture entity mentions from their surrounding cues
//! ("accepted into X", "majoring in Y"). Broader recall than the gazetteer
//! scan, so hits carry lower confidence; a hit that resolves to a known
//! canonical name is worth more than a bare span.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use admit_core::{EntityCandidate, EntityKind, ExtractMethodId, ExtractionMethod, Result};

use crate::gazetteer::Gazetteer;

/// Confidence for a pattern hit that resolves to a canonical name
pub const PATTERN_CANONICAL_CONFIDENCE: f64 = 0.7;

/// Confidence for a pattern hit kept as a raw span
pub const PATTERN_SPAN_CONFIDENCE: f64 = 0.45;

/// What to emit when a hit does not resolve to a canonical name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unresolved {
    /// Emit the capture group as the value
    Capture,
    /// Emit the whole match as the value
    FullMatch,
    /// Drop the hit
    Skip,
}

struct PatternRule {
    regex: Regex,
    kind: EntityKind,
    unresolved: Unresolved,
}

/// Regex-template extraction over the cleaned text
pub struct ContextPatterns {
    gazetteer: Arc<Gazetteer>,
    rules: Vec<PatternRule>,
}

impl ContextPatterns {
    pub fn new(gazetteer: Arc<Gazetteer>) -> Self {
        let mut patterns = Self {
            gazetteer,
            rules: Vec::new(),
        };

        patterns.init_university_rules();
        patterns.init_major_rules();
        patterns.init_program_rules();
        patterns
    }

    fn init_university_rules(&mut self) {
        self.add_rule(
            r"\bUniversity of ([A-Z][a-zA-Z]+(?: [A-Z][a-zA-Z]+){0,3})",
            EntityKind::University,
            Unresolved::FullMatch,
        );
        self.add_rule(
            r"\b([A-Z][a-zA-Z]+(?: [A-Z][a-zA-Z]+){0,2}) University\b",
            EntityKind::University,
            Unresolved::FullMatch,
        );
        self.add_rule(
            r"\b([A-Z]{2,5}) (?:[Uu]niversity|[Cc]ollege)\b",
            EntityKind::University,
            Unresolved::Capture,
        );
        self.add_rule(
            r"\b(?:[Ss]tudying at|[Aa]dmitted (?:to|into)|[Aa]ccepted (?:to|into)|[Aa]pplying to|[Ee]nrolled at) ([A-Z][a-zA-Z]*(?: [A-Z][a-zA-Z]*){0,3})",
            EntityKind::University,
            Unresolved::Capture,
        );
    }

    fn init_major_rules(&mut self) {
        self.add_rule(
            r"\b(?:[Mm]ajoring in|[Mm]ajor in|[Dd]egree in|[Ss]tudying) ([A-Z][a-zA-Z]*(?: [A-Z][a-zA-Z]*){0,3})",
            EntityKind::Major,
            Unresolved::Capture,
        );
        // Lowercase mentions only count when they resolve to a known major
        self.add_rule(
            r"\b(?:[Mm]ajoring in|[Mm]ajor in|[Dd]egree in) ([a-z]+(?: [a-z]+){0,3})",
            EntityKind::Major,
            Unresolved::Skip,
        );
    }

    fn init_program_rules(&mut self) {
        self.add_rule(
            r"(?i)\b(phd|ph\.d\.|doctorate|doctoral) (?:in|program|student|degree)\b",
            EntityKind::Program,
            Unresolved::Skip,
        );
        self.add_rule(
            r"(?i)\b(master|masters|ms|ma|meng|msc) (?:in|of|program|degree)\b",
            EntityKind::Program,
            Unresolved::Skip,
        );
        self.add_rule(
            r"(?i)\b(bachelor|bachelors|bs|ba|bsc|undergraduate) (?:in|of|program|degree)\b",
            EntityKind::Program,
            Unresolved::Skip,
        );
        self.add_rule(
            r"(?i)\bapplying for (?:an? |the )?(phd|master|masters|bachelor|bachelors|mba|postdoc)\b",
            EntityKind::Program,
            Unresolved::Skip,
        );
    }

    fn add_rule(&mut self, pattern: &str, kind: EntityKind, unresolved: Unresolved) {
        if let Ok(regex) = Regex::new(pattern) {
            self.rules.push(PatternRule {
                regex,
                kind,
                unresolved,
            });
        }
    }

    /// Resolve a span to a canonical name, retrying with trailing words
    /// stripped so that a greedy capture like "computer science at" still
    /// finds "computer science".
    fn shrink_to_canonical(&self, kind: EntityKind, span: &str) -> Option<String> {
        let mut words: Vec<&str> = span.split_whitespace().collect();
        while !words.is_empty() {
            let candidate = words.join(" ");
            if let Some(canonical) = self.gazetteer.canonicalize(kind, &candidate) {
                return Some(canonical.to_string());
            }
            words.pop();
        }
        None
    }
}

#[async_trait]
impl ExtractionMethod for ContextPatterns {
    fn id(&self) -> ExtractMethodId {
        ExtractMethodId::Pattern
    }

    async fn candidates(&self, text: &str) -> Result<Vec<EntityCandidate>> {
        let mut candidates = Vec::new();
        let mut seen: HashSet<(EntityKind, String)> = HashSet::new();

        for rule in &self.rules {
            for caps in rule.regex.captures_iter(text) {
                let Some(full) = caps.get(0) else { continue };
                let Some(capture) = caps.get(1) else { continue };

                let resolved = self
                    .shrink_to_canonical(rule.kind, capture.as_str())
                    .or_else(|| self.shrink_to_canonical(rule.kind, full.as_str()));

                let (value, confidence) = match resolved {
                    Some(canonical) => (canonical, PATTERN_CANONICAL_CONFIDENCE),
                    None => {
                        let span = match rule.unresolved {
                            Unresolved::Capture => capture.as_str(),
                            Unresolved::FullMatch => full.as_str(),
                            Unresolved::Skip => continue,
                        };
                        let span = span.split_whitespace().collect::<Vec<_>>().join(" ");
                        if span.is_empty() {
                            continue;
                        }
                        (span, PATTERN_SPAN_CONFIDENCE)
                    }
                };

                if seen.insert((rule.kind, value.to_lowercase())) {
                    candidates.push(EntityCandidate::new(
                        ExtractMethodId::Pattern,
                        rule.kind,
                        capture.as_str(),
                        value,
                        confidence,
                    ));
                }
            }
        }

        Ok(candidates)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn extract(text: &str) -> Vec<EntityCandidate> {
        ContextPatterns::new(Arc::new(Gazetteer::builtin()))
            .candidates(text)
            .await
            .unwrap()
    }

    fn find<'a>(
        found: &'a [EntityCandidate],
        kind: EntityKind,
        value: &str,
    ) -> Option<&'a EntityCandidate> {
        found
            .iter()
            .find(|c| c.kind == kind && c.normalized_value == value)
    }

    #[tokio::test]
    async fn test_cue_resolves_to_canonical() {
        let found = extract("Just got accepted into MIT for Computer Science PhD").await;
        let mit = find(&found, EntityKind::University, "MIT").unwrap();
        assert_eq!(mit.confidence, PATTERN_CANONICAL_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_university_of_form() {
        let found = extract("I will be studying at the University of Washington next fall").await;
        assert!(find(&found, EntityKind::University, "University of Washington").is_some());
    }

    #[tokio::test]
    async fn test_unknown_university_kept_as_span() {
        let found = extract("I got into the University of Waterloo yesterday").await;
        let hit = find(&found, EntityKind::University, "University of Waterloo").unwrap();
        assert_eq!(hit.confidence, PATTERN_SPAN_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_major_cue_with_greedy_capture() {
        let found = extract("I am majoring in Computer Science At Least For Now").await;
        let major = find(&found, EntityKind::Major, "Computer Science");
        assert!(major.is_some(), "greedy capture should shrink to a canonical");
        assert_eq!(major.unwrap().confidence, PATTERN_CANONICAL_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_unknown_major_kept_as_span() {
        let found = extract("I ended up majoring in Medieval Basket Weaving somehow").await;
        let hit = find(&found, EntityKind::Major, "Medieval Basket Weaving").unwrap();
        assert_eq!(hit.confidence, PATTERN_SPAN_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_lowercase_major_only_when_known() {
        let found = extract("thinking about majoring in computer science").await;
        assert!(find(&found, EntityKind::Major, "Computer Science").is_some());

        let found = extract("thinking about majoring in something easy").await;
        assert!(found.iter().all(|c| c.kind != EntityKind::Major));
    }

    #[tokio::test]
    async fn test_program_cues() {
        let found = extract("Starting my PhD in mathematics after a Masters degree").await;
        assert!(find(&found, EntityKind::Program, "PhD").is_some());
        assert!(find(&found, EntityKind::Program, "Master").is_some());
    }

    #[tokio::test]
    async fn test_no_candidates_on_plain_text() {
        let found = extract("the weather was nice and we went for a long walk").await;
        assert!(found.is_empty());
    }
}

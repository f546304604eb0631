//! Rule-based organization tagger filling the statistical NER slot.
//!
//! Tags capitalized token runs that look like institution names and pulls
//! degree programs out of the surrounding context. No model weights: the
//! tagger has no score of its own, so every hit carries the same moderate
//! confidence and fusion treats it as a corroborating vote.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use admit_core::{EntityCandidate, EntityKind, ExtractMethodId, ExtractionMethod, Result};

use crate::gazetteer::Gazetteer;

/// Fixed confidence for tagger hits
pub const NER_CONFIDENCE: f64 = 0.55;

/// Words that mark a capitalized run as an institution
const INSTITUTION_INDICATORS: &[&str] = &[
    "university",
    "college",
    "institute",
    "school",
    "tech",
    "polytechnic",
    "academy",
];

/// Degree-program cues scanned in the context around an institution
/// mention. First hit wins. Trailing spaces keep the two-letter forms from
/// matching inside words.
const PROGRAM_CONTEXT: &[(&str, &str)] = &[
    ("phd", "PhD"),
    ("ph.d.", "PhD"),
    ("doctorate", "PhD"),
    ("doctoral", "PhD"),
    ("master", "Master"),
    ("masters", "Master"),
    ("ms ", "Master"),
    ("ma ", "Master"),
    ("meng", "Master"),
    ("msc", "Master"),
    ("bachelor", "Bachelor"),
    ("bachelors", "Bachelor"),
    ("bs ", "Bachelor"),
    ("ba ", "Bachelor"),
    ("bsc", "Bachelor"),
    ("undergraduate", "Bachelor"),
    ("mba", "MBA"),
    ("jd", "JD"),
    ("md", "MD"),
    ("postdoc", "Postdoc"),
];

/// Number of characters of context inspected on each side of a mention
const CONTEXT_PAD: usize = 50;

/// Institution tagger over capitalized token runs
pub struct OrgTagger {
    gazetteer: Arc<Gazetteer>,
    org_pattern: Option<Regex>,
}

impl OrgTagger {
    pub fn new(gazetteer: Arc<Gazetteer>) -> Self {
        let org_pattern =
            Regex::new(r"\b[A-Z][a-zA-Z]*(?:(?: (?:of|the|and))? [A-Z][a-zA-Z]*)*").ok();

        Self {
            gazetteer,
            org_pattern,
        }
    }

    fn looks_like_institution(span: &str) -> bool {
        let lower = span.to_lowercase();
        INSTITUTION_INDICATORS
            .iter()
            .any(|indicator| lower.contains(indicator))
    }

    fn program_from_context(context: &str) -> Option<(&'static str, &'static str)> {
        let lower = context.to_lowercase();
        PROGRAM_CONTEXT
            .iter()
            .find(|(indicator, _)| lower.contains(indicator))
            .copied()
    }
}

/// Widen a byte range by `pad` on both sides, stepping to char boundaries
fn context_slice(text: &str, start: usize, end: usize, pad: usize) -> &str {
    let mut from = start.saturating_sub(pad);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = end.saturating_add(pad).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    &text[from..to]
}

#[async_trait]
impl ExtractionMethod for OrgTagger {
    fn id(&self) -> ExtractMethodId {
        ExtractMethodId::Spacy
    }

    async fn candidates(&self, text: &str) -> Result<Vec<EntityCandidate>> {
        let Some(pattern) = &self.org_pattern else {
            return Ok(Vec::new());
        };

        let mut candidates = Vec::new();
        let mut seen: HashSet<(EntityKind, String)> = HashSet::new();

        for mat in pattern.find_iter(text) {
            let span = mat.as_str();
            let multi_word = span.contains(' ');
            let canonical = self.gazetteer.canonicalize(EntityKind::University, span);

            // Single capitalized words are too ambiguous unless the table
            // already knows them
            if !Self::looks_like_institution(span) || (!multi_word && canonical.is_none()) {
                continue;
            }

            let value = canonical.map(|c| c.to_string()).unwrap_or_else(|| {
                span.split_whitespace().collect::<Vec<_>>().join(" ")
            });
            if seen.insert((EntityKind::University, value.to_lowercase())) {
                candidates.push(EntityCandidate::new(
                    ExtractMethodId::Spacy,
                    EntityKind::University,
                    span,
                    value,
                    NER_CONFIDENCE,
                ));
            }

            let context = context_slice(text, mat.start(), mat.end(), CONTEXT_PAD);
            if let Some((indicator, program)) = Self::program_from_context(context) {
                if seen.insert((EntityKind::Program, program.to_lowercase())) {
                    candidates.push(EntityCandidate::new(
                        ExtractMethodId::Spacy,
                        EntityKind::Program,
                        indicator.trim(),
                        program,
                        NER_CONFIDENCE,
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
        OrgTagger::new(Arc::new(Gazetteer::builtin()))
            .candidates(text)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_known_institution_is_canonicalized() {
        let found = extract("I finally visited Georgia Institute of Technology last week").await;
        let uni = found
            .iter()
            .find(|c| c.kind == EntityKind::University)
            .unwrap();
        assert_eq!(uni.normalized_value, "Georgia Tech");
        assert_eq!(uni.confidence, NER_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_unknown_institution_kept_as_span() {
        let found = extract("My friend goes to Waseda University in Tokyo").await;
        assert!(found
            .iter()
            .any(|c| c.kind == EntityKind::University && c.normalized_value == "Waseda University"));
        // "Tokyo" alone is not an institution
        assert!(!found.iter().any(|c| c.normalized_value == "Tokyo"));
    }

    #[tokio::test]
    async fn test_program_pulled_from_context() {
        let found = extract("Finishing my PhD application to Stanford University next month").await;
        assert!(found
            .iter()
            .any(|c| c.kind == EntityKind::Program && c.normalized_value == "PhD"));
    }

    #[tokio::test]
    async fn test_single_word_mentions_are_skipped() {
        let found = extract("School starts tomorrow and College was fun").await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_context_slice_respects_char_boundaries() {
        let text = "申请 Stanford University 的研究生项目";
        let start = text.find("Stanford").unwrap();
        let end = start + "Stanford University".len();
        // A pad of 2 lands mid-character on both sides; must not panic
        let context = context_slice(text, start, end, 2);
        assert!(context.contains("Stanford University"));
    }

    #[tokio::test]
    async fn test_plain_text_yields_nothing() {
        let found = extract("just wanted to say thanks for all the help").await;
        assert!(found.is_empty());
    }
}

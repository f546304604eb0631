//! Text normalization for raw posts
//!
//! Cleans markup and noise out of post text, expands domain abbreviations,
//! detects the content language, and computes the content hash used for
//! exact-duplicate detection. Normalization is a total function: malformed
//! input produces an empty cleaned record, never an error.

pub mod language;

pub use language::detect_language;

use admit_core::{CleanPost, ProcessingConfig, RawPost};
use regex::Regex;
use sha2::{Digest, Sha256};

// ============================================================================
// Cleaning Rules
// ============================================================================

/// Ordered substitution passes applied to every text field.
///
/// URL and entity removal runs before abbreviation expansion so that
/// addresses are never expanded; whitespace collapses last.
const CLEAN_RULES: &[(&str, &str)] = &[
    // URLs and e-mail addresses
    (r"https?://\S+", ""),
    (r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b", ""),
    // HTML entities
    (r"&[a-zA-Z0-9#]+;", " "),
    // Domain abbreviations; acronym expansions are case-sensitive so that
    // prose words ("me", "cs majors" aside) are left alone
    (r"(?i)\buni\b", "university"),
    (r"\bCS\b", "Computer Science"),
    (r"\bEE\b", "Electrical Engineering"),
    (r"\bME\b", "Mechanical Engineering"),
    (r"\bCMU\b", "Carnegie Mellon University"),
    (r"\bMIT\b", "Massachusetts Institute of Technology"),
    (r"\bUC\b", "University of California"),
    (r"\bGPA\b", "Grade Point Average"),
    (r"\bGRE\b", "Graduate Record Examination"),
    (r"\bTOEFL\b", "Test of English as a Foreign Language"),
    (r"\bIELTS\b", "International English Language Testing System"),
    // Everything outside word characters and basic punctuation
    (r#"[^\w\s.,!?;:()'"\-]+"#, " "),
    // Runs of punctuation
    (r"[.]{2,}", "."),
    (r"[!]{2,}", "!"),
    (r"[?]{2,}", "?"),
    // Whitespace collapses last
    (r"\s+", " "),
];

/// Sentence-ranking keywords for the key-content summary
const KEY_CONTENT_KEYWORDS: &[&str] = &[
    "university",
    "college",
    "admission",
    "application",
    "gpa",
    "experience",
    "recommend",
    "difficult",
    "easy",
    "good",
    "bad",
];

// ============================================================================
// Normalizer
// ============================================================================

/// Cleans raw posts into [`CleanPost`] records
pub struct Normalizer {
    rules: Vec<(Regex, &'static str)>,
    sentence_split: Option<Regex>,
    min_content_length: usize,
    max_content_length: usize,
}

impl Normalizer {
    pub fn new(config: &ProcessingConfig) -> Self {
        let mut rules = Vec::with_capacity(CLEAN_RULES.len());
        for (pattern, replacement) in CLEAN_RULES {
            if let Ok(regex) = Regex::new(pattern) {
                rules.push((regex, *replacement));
            }
        }

        Self {
            rules,
            sentence_split: Regex::new(r"[.!?]+").ok(),
            min_content_length: config.min_content_length,
            max_content_length: config.max_content_length,
        }
    }

    /// Normalize one raw post.
    ///
    /// Comments are cleaned individually and folded into the body in reply
    /// order. Case is preserved for downstream proper-noun cues.
    pub fn normalize(&self, raw: &RawPost) -> CleanPost {
        let title = self.clean_text(&raw.title);

        let mut body = self.clean_text(&raw.body);
        for comment in &raw.comments {
            let cleaned = self.clean_text(comment);
            if cleaned.is_empty() {
                continue;
            }
            if !body.is_empty() {
                body.push(' ');
            }
            body.push_str(&cleaned);
        }

        let language = detect_language(&format!("{} {}", title, body));
        let content_hash = content_hash(&title, &body);
        let body_chars = body.chars().count();
        let valid_length =
            body_chars >= self.min_content_length && body_chars <= self.max_content_length;

        tracing::debug!(
            id = %raw.id,
            language = %language,
            chars = body_chars,
            valid_length,
            "normalized post"
        );

        CleanPost {
            id: raw.id.clone(),
            subreddit: raw.subreddit.clone(),
            title,
            body,
            language,
            content_hash,
            valid_length,
        }
    }

    /// Run the ordered substitution passes over one text field
    pub fn clean_text(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut current = text.to_string();
        for (regex, replacement) in &self.rules {
            current = regex.replace_all(&current, *replacement).into_owned();
        }
        current.trim().to_string()
    }

    /// Extractive summary: the top sentences by domain-keyword density,
    /// joined in score order. Used by the viewer/export side only.
    pub fn key_content(&self, text: &str, max_sentences: usize) -> String {
        let Some(split) = &self.sentence_split else {
            return text.to_string();
        };

        let sentences: Vec<&str> = split
            .split(text)
            .map(str::trim)
            .filter(|s| s.chars().count() > 20)
            .collect();

        if sentences.len() <= max_sentences {
            return sentences.join(". ");
        }

        let mut scored: Vec<(&str, f64)> = sentences
            .iter()
            .map(|sentence| {
                let lower = sentence.to_lowercase();
                let keyword_hits = KEY_CONTENT_KEYWORDS
                    .iter()
                    .filter(|k| lower.contains(*k))
                    .count() as f64;
                let length_score = (sentence.chars().count() as f64 / 100.0).min(1.0);
                (*sentence, keyword_hits + length_score)
            })
            .collect();

        // stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
            .iter()
            .take(max_sentences)
            .map(|(s, _)| *s)
            .collect::<Vec<_>>()
            .join(". ")
    }
}

/// SHA-256 hex digest over the cleaned title and body.
///
/// Computed after all cleaning passes so formatting differences cannot
/// defeat exact-duplicate detection.
pub fn content_hash(title: &str, body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use admit_core::Language;

    fn normalizer() -> Normalizer {
        Normalizer::new(&ProcessingConfig::default())
    }

    #[test]
    fn test_strips_urls_and_emails() {
        let n = normalizer();
        let cleaned = n.clean_text(
            "Check https://example.com/app?id=1 or mail admissions@mit.edu for details",
        );
        assert_eq!(cleaned, "Check or mail for details");
    }

    #[test]
    fn test_strips_html_entities_and_special_chars() {
        let n = normalizer();
        let cleaned = n.clean_text("Tough&nbsp;choice&#8230; stats \u{1F614} everywhere");
        assert!(!cleaned.contains("&nbsp;"));
        assert!(!cleaned.contains('\u{1F614}'));
        assert_eq!(cleaned, "Tough choice stats everywhere");
    }

    #[test]
    fn test_collapses_repeated_punctuation_and_whitespace() {
        let n = normalizer();
        assert_eq!(
            n.clean_text("Rejected!!!   Again...   why??"),
            "Rejected! Again. why?"
        );
    }

    #[test]
    fn test_expands_abbreviations() {
        let n = normalizer();
        let cleaned = n.clean_text("My uni GPA is low for CS at CMU");
        assert_eq!(
            cleaned,
            "My university Grade Point Average is low for Computer Science at Carnegie Mellon University"
        );
    }

    #[test]
    fn test_acronym_expansion_is_case_sensitive() {
        let n = normalizer();
        // lowercase "me" must not become Mechanical Engineering
        let cleaned = n.clean_text("believe me, cs is hard");
        assert_eq!(cleaned, "believe me, cs is hard");
    }

    #[test]
    fn test_content_hash_ignores_formatting_differences() {
        let n = normalizer();
        let a = n.normalize(&RawPost::new(
            "t3_a",
            "gradadmissions",
            "Admitted   to Stanford!",
            "So    happy about the program quality here honestly",
        ));
        let b = n.normalize(&RawPost::new(
            "t3_b",
            "gradadmissions",
            "Admitted to Stanford!",
            "So happy about   the program quality here honestly",
        ));
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_normalize_folds_comments_into_body() {
        let n = normalizer();
        let raw = RawPost::new("t3_c", "StudyAbroad", "Visa timeline?", "How long did it take")
            .with_comments(vec![
                "Took me about three weeks total".to_string(),
                String::new(),
                "Mine took two months, apply early".to_string(),
            ]);
        let clean = n.normalize(&raw);
        assert!(clean.body.starts_with("How long did it take"));
        assert!(clean.body.contains("three weeks"));
        assert!(clean.body.contains("two months"));
    }

    #[test]
    fn test_normalize_is_total_on_garbage() {
        let n = normalizer();
        let clean = n.normalize(&RawPost::new("t3_d", "test", "", "\u{0}\u{1F4A9}&#x1f4a9;"));
        assert!(clean.title.is_empty());
        assert!(clean.body.is_empty());
        assert!(!clean.valid_length);
        assert!(!clean.content_hash.is_empty());
    }

    #[test]
    fn test_valid_length_bounds() {
        let config = ProcessingConfig {
            min_content_length: 10,
            max_content_length: 40,
            ..Default::default()
        };
        let n = Normalizer::new(&config);
        let short = n.normalize(&RawPost::new("t3_e", "test", "t", "too short"));
        assert!(!short.valid_length);
        let ok = n.normalize(&RawPost::new("t3_f", "test", "t", "this body is long enough"));
        assert!(ok.valid_length);
    }

    #[test]
    fn test_language_detection_on_normalized_posts() {
        let n = normalizer();
        let en = n.normalize(&RawPost::new(
            "t3_g",
            "gradadmissions",
            "Application advice",
            "I am applying to a university program and my degree is in physics",
        ));
        assert_eq!(en.language, Language::En);

        let zh = n.normalize(&RawPost::new(
            "t3_h",
            "gradadmissions",
            "申请建议",
            "我正在申请美国的研究生项目，希望大家给一些建议，谢谢大家的帮助",
        ));
        assert_eq!(zh.language, Language::Zh);
    }

    #[test]
    fn test_key_content_prefers_keyword_sentences() {
        let n = normalizer();
        let text = "The weather was nice on the drive over there. \
                    The university admission process took four months of work. \
                    I would recommend the college application essays be done early. \
                    We stopped for lunch at a diner on the way back home.";
        let summary = n.key_content(text, 2);
        assert!(summary.contains("admission"));
        assert!(summary.contains("recommend"));
        assert!(!summary.contains("diner"));
    }
}

//! Lightweight language detection for post routing.
//!
//! The corpus is overwhelmingly English with occasional Chinese, Japanese,
//! Korean, and Russian posts. A full statistical detector is overkill for
//! that mix: common-word hits decide English, Unicode script counts decide
//! the rest.

use admit_core::Language;

use std::collections::HashSet;

/// Function words and domain terms that appear in essentially every
/// English post of meaningful length.
const ENGLISH_INDICATORS: &[&str] = &[
    "the",
    "and",
    "or",
    "but",
    "in",
    "on",
    "at",
    "to",
    "for",
    "of",
    "with",
    "university",
    "college",
    "school",
    "student",
    "study",
    "course",
    "program",
    "application",
    "admission",
    "degree",
    "major",
    "gpa",
    "sat",
    "gre",
    "i",
    "you",
    "he",
    "she",
    "it",
    "we",
    "they",
    "my",
    "your",
    "his",
    "her",
];

/// Number of distinct indicator words required to call a text English.
const ENGLISH_HIT_THRESHOLD: usize = 3;

/// Texts shorter than this are too thin to classify and default to
/// English, the dominant language of the corpus.
const MIN_DETECTABLE_CHARS: usize = 10;

/// Detects the dominant language of `text`.
///
/// English is decided by distinct common-word hits; CJK and Cyrillic
/// scripts are decided by character counts. Kana is checked before Han
/// because Japanese text mixes both scripts.
pub fn detect_language(text: &str) -> Language {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_DETECTABLE_CHARS {
        return Language::En;
    }

    let mut hits: HashSet<&str> = HashSet::new();
    let lowered = trimmed.to_lowercase();
    for token in lowered.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        if let Some(word) = ENGLISH_INDICATORS.iter().copied().find(|w| *w == token) {
            hits.insert(word);
        }
    }
    if hits.len() >= ENGLISH_HIT_THRESHOLD {
        return Language::En;
    }

    let mut kana = 0usize;
    let mut hangul = 0usize;
    let mut han = 0usize;
    let mut cyrillic = 0usize;
    for c in trimmed.chars() {
        match c as u32 {
            // Hiragana and katakana
            0x3040..=0x30FF => kana += 1,
            // Hangul syllables and jamo
            0x1100..=0x11FF | 0xAC00..=0xD7AF => hangul += 1,
            // CJK unified ideographs
            0x4E00..=0x9FFF | 0x3400..=0x4DBF => han += 1,
            // Cyrillic
            0x0400..=0x04FF => cyrillic += 1,
            _ => {}
        }
    }

    if kana >= 2 {
        Language::Ja
    } else if hangul >= 2 {
        Language::Ko
    } else if han >= 2 {
        Language::Zh
    } else if cyrillic >= 3 {
        Language::Ru
    } else {
        Language::Unknown
    }
}

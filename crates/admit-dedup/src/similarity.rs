//! Text similarity scoring for near-duplicate detection

use std::collections::HashSet;

/// Above this many combined characters, edit distance gives way to
/// token-set overlap. Edit distance is quadratic in text length and
/// posts with folded comments can run to thousands of characters.
const EDIT_DISTANCE_CUTOFF: usize = 512;

/// Similarity of two cleaned texts in [0, 1].
///
/// Case-insensitive. Short pairs use normalized Levenshtein, which
/// catches character-level edits; long pairs use Jaccard overlap of
/// their token sets.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    if a.chars().count() + b.chars().count() <= EDIT_DISTANCE_CUTOFF {
        strsim::normalized_levenshtein(&a, &b)
    } else {
        token_set_jaccard(&a, &b)
    }
}

/// Jaccard overlap of whitespace token sets
fn token_set_jaccard(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.len() + tokens_b.len() - intersection;

    intersection as f64 / union as f64
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical_texts_score_one() {
        assert_eq!(text_similarity("accepted into MIT", "accepted into MIT"), 1.0);
        assert_eq!(text_similarity("", ""), 1.0);
    }

    #[test]
    fn test_case_differences_are_ignored() {
        assert_eq!(text_similarity("Accepted Into MIT", "accepted into mit"), 1.0);
    }

    #[test]
    fn test_unrelated_texts_score_low() {
        let score = text_similarity("accepted into MIT", "zzz qqq xxx");
        assert!(score < 0.3, "score was {score}");
    }

    #[test]
    fn test_small_edit_stays_above_dedup_threshold() {
        let a = "Just got accepted into MIT for Computer Science, so excited to start";
        let b = "Just got accepted into MIT for Computer Science, so excited to start!";
        assert!(text_similarity(a, b) >= 0.85);
    }

    #[test]
    fn test_long_texts_use_token_overlap() {
        let base = "i am applying to several graduate programs this cycle and \
                    would appreciate any advice about statements of purpose "
            .repeat(4);
        let reordered = format!("any advice appreciated {base}");

        // Well past the edit-distance cutoff
        assert!(base.len() + reordered.len() > 512);
        assert!(text_similarity(&base, &reordered) >= 0.85);
    }

    #[test]
    fn test_empty_versus_nonempty_scores_zero() {
        assert_eq!(text_similarity("", "some text"), 0.0);
    }

    proptest! {
        #[test]
        fn test_similarity_is_symmetric(a in "[a-zA-Z ]{0,60}", b in "[a-zA-Z ]{0,60}") {
            prop_assert_eq!(text_similarity(&a, &b), text_similarity(&b, &a));
        }

        #[test]
        fn test_similarity_is_bounded(a in "[a-zA-Z ]{0,60}", b in "[a-zA-Z ]{0,60}") {
            let score = text_similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn test_text_is_similar_to_itself(a in "[a-zA-Z ]{0,60}") {
            prop_assert_eq!(text_similarity(&a, &a), 1.0);
        }
    }
}

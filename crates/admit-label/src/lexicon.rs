//! Lexicon sentiment scorers.
//!
//! Two offline sentiment methods in the mold of the TextBlob and VADER
//! analyzers: [`PolarityScorer`] averages word polarities over the text,
//! [`ValenceScorer`] sums word valences with booster and negation
//! handling and squashes the total into a compound score. Both vote only
//! on the sentiment dimension and fall back to a neutral vote when the
//! text contains no lexicon words.

use std::collections::HashMap;

use async_trait::async_trait;

use admit_core::{Dimension, LabelCandidate, LabelMethod, LabelMethodId, Result};

/// Tokens that flip the polarity of a nearby word
pub(crate) const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "neither", "nor", "cannot", "cant", "can't", "dont", "don't",
    "didnt", "didn't", "doesnt", "doesn't", "isnt", "isn't", "wasnt", "wasn't", "wont", "won't",
    "wouldnt", "wouldn't", "couldnt", "couldn't", "shouldnt", "shouldn't", "aint", "ain't",
    "without",
];

/// Polarity band treated as neutral by the polarity scorer
const POLARITY_BAND: f64 = 0.1;

/// Compound band treated as neutral by the valence scorer
const COMPOUND_BAND: f64 = 0.05;

/// Scalar applied to a valence hit inside a negation window
const NEGATION_SCALAR: f64 = -0.74;

/// Booster adjustment for intensifying and dampening modifiers
const INTENSITY_INCREMENT: f64 = 0.293;
const INTENSITY_DECREMENT: f64 = -0.293;

/// How many preceding tokens count as context for a valence hit
const VALENCE_WINDOW: usize = 3;

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_string()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

// ============================================================================
// Word tables
// ============================================================================

/// Word polarities in [-1, 1], weighted toward admissions vocabulary
const POLARITY_WORDS: &[(&str, f64)] = &[
    ("accepted", 0.8),
    ("accomplished", 0.7),
    ("amazing", 0.9),
    ("awesome", 0.9),
    ("beautiful", 0.7),
    ("best", 0.8),
    ("better", 0.5),
    ("blessed", 0.8),
    ("brilliant", 0.8),
    ("confident", 0.5),
    ("congratulations", 0.9),
    ("delighted", 0.9),
    ("ecstatic", 1.0),
    ("excellent", 0.9),
    ("excited", 0.8),
    ("fantastic", 0.9),
    ("fortunate", 0.7),
    ("glad", 0.6),
    ("good", 0.5),
    ("grateful", 0.8),
    ("great", 0.7),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("hopeful", 0.5),
    ("impressive", 0.6),
    ("incredible", 0.9),
    ("love", 0.8),
    ("lucky", 0.6),
    ("outstanding", 0.9),
    ("passionate", 0.6),
    ("perfect", 1.0),
    ("pleased", 0.6),
    ("proud", 0.7),
    ("relieved", 0.6),
    ("stoked", 0.9),
    ("succeeded", 0.7),
    ("success", 0.7),
    ("thankful", 0.8),
    ("thrilled", 1.0),
    ("wonderful", 0.9),
    ("anxious", -0.5),
    ("awful", -0.9),
    ("bad", -0.6),
    ("brutal", -0.8),
    ("crushed", -0.8),
    ("depressed", -0.8),
    ("devastated", -0.9),
    ("disappointed", -0.7),
    ("disappointing", -0.7),
    ("discouraged", -0.6),
    ("dreadful", -0.9),
    ("exhausted", -0.6),
    ("failed", -0.7),
    ("failure", -0.7),
    ("fear", -0.6),
    ("frustrated", -0.7),
    ("hate", -0.8),
    ("heartbroken", -0.9),
    ("hopeless", -0.8),
    ("horrible", -0.9),
    ("hurt", -0.6),
    ("miserable", -0.8),
    ("nervous", -0.4),
    ("overwhelmed", -0.6),
    ("painful", -0.7),
    ("poor", -0.5),
    ("regret", -0.6),
    ("rejected", -0.7),
    ("rejection", -0.6),
    ("sad", -0.6),
    ("scared", -0.6),
    ("stressed", -0.7),
    ("stressful", -0.7),
    ("struggling", -0.6),
    ("terrible", -0.9),
    ("unfair", -0.6),
    ("unhappy", -0.7),
    ("upset", -0.6),
    ("waste", -0.6),
    ("worried", -0.5),
    ("worst", -0.9),
    ("worthless", -0.8),
];

/// Word valences in [-4, 4]
const VALENCE_WORDS: &[(&str, f64)] = &[
    ("accepted", 1.6),
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("best", 3.2),
    ("better", 1.9),
    ("blessed", 2.9),
    ("brilliant", 2.8),
    ("confident", 2.2),
    ("congratulations", 2.9),
    ("delighted", 2.9),
    ("excellent", 2.7),
    ("excited", 2.3),
    ("fantastic", 2.6),
    ("glad", 2.0),
    ("good", 1.9),
    ("grateful", 2.2),
    ("great", 3.1),
    ("happy", 2.7),
    ("hope", 1.9),
    ("hopeful", 1.8),
    ("impressive", 2.2),
    ("love", 3.2),
    ("lucky", 1.8),
    ("outstanding", 2.8),
    ("perfect", 2.7),
    ("pleased", 2.1),
    ("proud", 2.2),
    ("relieved", 1.9),
    ("success", 2.7),
    ("successful", 2.7),
    ("thankful", 2.3),
    ("thrilled", 2.8),
    ("win", 2.8),
    ("wonderful", 2.7),
    ("worth", 0.9),
    ("afraid", -2.2),
    ("angry", -2.3),
    ("anxious", -1.9),
    ("awful", -2.9),
    ("bad", -2.5),
    ("brutal", -2.8),
    ("crushed", -2.0),
    ("depressed", -2.7),
    ("devastated", -3.1),
    ("disappointed", -2.1),
    ("disappointing", -2.2),
    ("discouraged", -1.8),
    ("dreadful", -3.0),
    ("exhausted", -1.6),
    ("fail", -2.5),
    ("failed", -2.3),
    ("failure", -2.6),
    ("fear", -2.2),
    ("frustrated", -2.2),
    ("hate", -2.7),
    ("heartbroken", -3.2),
    ("hopeless", -2.6),
    ("horrible", -2.9),
    ("hurt", -2.2),
    ("lost", -1.3),
    ("miserable", -2.8),
    ("nervous", -1.5),
    ("overwhelmed", -1.7),
    ("regret", -1.9),
    ("rejected", -2.0),
    ("rejection", -2.1),
    ("sad", -2.1),
    ("scared", -2.2),
    ("stressed", -1.8),
    ("stressful", -1.9),
    ("terrible", -3.0),
    ("unfair", -2.1),
    ("unhappy", -2.2),
    ("upset", -2.0),
    ("waste", -1.8),
    ("worried", -1.9),
    ("worst", -3.1),
    ("worthless", -2.5),
];

const BOOSTER_WORDS: &[(&str, f64)] = &[
    ("absolutely", INTENSITY_INCREMENT),
    ("completely", INTENSITY_INCREMENT),
    ("extremely", INTENSITY_INCREMENT),
    ("incredibly", INTENSITY_INCREMENT),
    ("really", INTENSITY_INCREMENT),
    ("so", INTENSITY_INCREMENT),
    ("super", INTENSITY_INCREMENT),
    ("totally", INTENSITY_INCREMENT),
    ("very", INTENSITY_INCREMENT),
    ("barely", INTENSITY_DECREMENT),
    ("hardly", INTENSITY_DECREMENT),
    ("kinda", INTENSITY_DECREMENT),
    ("little", INTENSITY_DECREMENT),
    ("slightly", INTENSITY_DECREMENT),
    ("somewhat", INTENSITY_DECREMENT),
];

// ============================================================================
// Polarity scorer
// ============================================================================

/// Mean-polarity sentiment method
pub struct PolarityScorer {
    lexicon: HashMap<&'static str, f64>,
}

impl PolarityScorer {
    pub fn new() -> Self {
        Self {
            lexicon: POLARITY_WORDS.iter().copied().collect(),
        }
    }
}

impl Default for PolarityScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelMethod for PolarityScorer {
    fn id(&self) -> LabelMethodId {
        LabelMethodId::Textblob
    }

    fn dimensions(&self) -> &'static [Dimension] {
        &[Dimension::Sentiment]
    }

    async fn score(&self, text: &str) -> Result<Vec<LabelCandidate>> {
        let mut sum = 0.0;
        let mut count = 0usize;

        for token in tokenize(text) {
            if let Some(&polarity) = self.lexicon.get(token.as_str()) {
                sum += polarity;
                count += 1;
            }
        }

        let polarity = if count == 0 { 0.0 } else { sum / count as f64 };
        let score = (polarity + 1.0) / 2.0 * 10.0;
        let label = if polarity > POLARITY_BAND {
            "积极"
        } else if polarity < -POLARITY_BAND {
            "消极"
        } else {
            "中性"
        };

        Ok(vec![LabelCandidate::new(
            LabelMethodId::Textblob,
            Dimension::Sentiment,
            label,
            score,
        )])
    }
}

// ============================================================================
// Valence scorer
// ============================================================================

/// Compound-valence sentiment method with booster and negation context
pub struct ValenceScorer {
    lexicon: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
}

impl ValenceScorer {
    pub fn new() -> Self {
        Self {
            lexicon: VALENCE_WORDS.iter().copied().collect(),
            boosters: BOOSTER_WORDS.iter().copied().collect(),
        }
    }

    fn compound(&self, tokens: &[String]) -> f64 {
        let mut sum = 0.0;
        let mut hits = 0usize;

        for (index, token) in tokens.iter().enumerate() {
            let Some(&base) = self.lexicon.get(token.as_str()) else {
                continue;
            };

            let mut valence = base;
            let window = &tokens[index.saturating_sub(VALENCE_WINDOW)..index];
            let mut boost = 0.0;
            let mut negated = false;
            for context in window {
                if let Some(&adjustment) = self.boosters.get(context.as_str()) {
                    boost += adjustment;
                }
                if NEGATORS.contains(&context.as_str()) {
                    negated = true;
                }
            }

            if valence > 0.0 {
                valence += boost;
            } else {
                valence -= boost;
            }
            if negated {
                valence *= NEGATION_SCALAR;
            }

            sum += valence;
            hits += 1;
        }

        if hits == 0 {
            0.0
        } else {
            (sum / (sum * sum + 15.0).sqrt()).clamp(-1.0, 1.0)
        }
    }
}

impl Default for ValenceScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelMethod for ValenceScorer {
    fn id(&self) -> LabelMethodId {
        LabelMethodId::Vader
    }

    fn dimensions(&self) -> &'static [Dimension] {
        &[Dimension::Sentiment]
    }

    async fn score(&self, text: &str) -> Result<Vec<LabelCandidate>> {
        let compound = self.compound(&tokenize(text));
        let score = (compound + 1.0) / 2.0 * 10.0;
        let label = if compound > COMPOUND_BAND {
            "积极"
        } else if compound < -COMPOUND_BAND {
            "消极"
        } else {
            "中性"
        };

        Ok(vec![LabelCandidate::new(
            LabelMethodId::Vader,
            Dimension::Sentiment,
            label,
            score,
        )])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn polarity(text: &str) -> LabelCandidate {
        PolarityScorer::new().score(text).await.unwrap().remove(0)
    }

    async fn valence(text: &str) -> LabelCandidate {
        ValenceScorer::new().score(text).await.unwrap().remove(0)
    }

    #[tokio::test]
    async fn test_polarity_positive_text() {
        let vote = polarity("So excited and grateful, this is amazing").await;

        assert_eq!(vote.label, "积极");
        assert!(vote.score > 5.0);
    }

    #[tokio::test]
    async fn test_polarity_negative_text() {
        let vote = polarity("Rejected again. Disappointed and stressed.").await;

        assert_eq!(vote.label, "消极");
        assert!(vote.score < 5.0);
    }

    #[tokio::test]
    async fn test_polarity_without_lexicon_words_is_neutral() {
        let vote = polarity("The deadline is January 15").await;

        assert_eq!(vote.label, "中性");
        assert_eq!(vote.score, 5.0);
    }

    #[tokio::test]
    async fn test_polarity_balanced_text_stays_in_the_neutral_band() {
        let vote = polarity("happy but disappointed").await;
        assert_eq!(vote.label, "中性");
    }

    #[tokio::test]
    async fn test_polarity_votes_only_on_sentiment() {
        let scorer = PolarityScorer::new();
        let votes = scorer.score("excited about Stanford").await.unwrap();

        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].dimension, Dimension::Sentiment);
        assert_eq!(votes[0].method, LabelMethodId::Textblob);
    }

    #[tokio::test]
    async fn test_valence_negation_flips_a_positive_word() {
        let vote = valence("I am not happy about this decision").await;

        assert_eq!(vote.label, "消极");
        assert!(vote.score < 5.0);
    }

    #[tokio::test]
    async fn test_valence_boosters_amplify() {
        let plain = valence("happy with the outcome").await;
        let boosted = valence("extremely happy with the outcome").await;

        assert!(boosted.score > plain.score);
    }

    #[tokio::test]
    async fn test_valence_dampeners_soften() {
        let plain = valence("happy with the outcome").await;
        let softened = valence("slightly happy with the outcome").await;

        assert!(softened.score < plain.score);
        assert_eq!(softened.label, "积极");
    }

    #[tokio::test]
    async fn test_valence_without_lexicon_words_is_neutral() {
        let vote = valence("Deadline is on Friday").await;

        assert_eq!(vote.label, "中性");
        assert_eq!(vote.score, 5.0);
    }

    #[tokio::test]
    async fn test_valence_strong_positive_text() {
        let vote = valence("Love this amazing wonderful program").await;

        assert_eq!(vote.label, "积极");
        assert!(vote.score > 9.0);
    }
}

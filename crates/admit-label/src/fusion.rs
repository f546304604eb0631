//! Weighted vote fusion per dimension.
//!
//! Votes are merged as a weighted score average, the average is snapped
//! to its nearest label, and confidence is the weighted share of votes
//! that named that label, damped when few methods voted. A dimension
//! below the confidence threshold abstains rather than emitting a shaky
//! label, and the abstention reason records whether votes were missing,
//! methods were down, or agreement was too thin.

use admit_core::{AbstainReason, Dimension, DimensionOutcome, LabelCandidate, LabelingConfig};

/// Fuse one dimension's votes into a label or an abstention.
///
/// `configured` counts the methods set up to cover this dimension;
/// `available` counts those that actually produced an answer this time.
pub fn fuse_dimension(
    dimension: Dimension,
    candidates: &[LabelCandidate],
    configured: usize,
    available: usize,
    config: &LabelingConfig,
) -> DimensionOutcome {
    if configured == 0 {
        return abstain(AbstainReason::NoCandidates, 0.0);
    }
    if available == 0 {
        return abstain(AbstainReason::MethodUnavailable, 0.0);
    }

    let votes: Vec<&LabelCandidate> = candidates
        .iter()
        .filter(|candidate| candidate.dimension == dimension)
        .collect();
    if votes.is_empty() {
        return abstain(AbstainReason::NoCandidates, 0.0);
    }

    let total_weight: f64 = votes.iter().map(|vote| config.weight(vote.method)).sum();
    if total_weight <= 0.0 {
        return abstain(AbstainReason::NoCandidates, 0.0);
    }

    let fused_score = votes
        .iter()
        .map(|vote| config.weight(vote.method) * vote.score)
        .sum::<f64>()
        / total_weight;
    let label = dimension.bucket(fused_score);

    let agreeing_weight: f64 = votes
        .iter()
        .filter(|vote| vote.label == label)
        .map(|vote| config.weight(vote.method))
        .sum();
    // A single voter caps out at 0.5 so one method alone never labels
    let damping = (votes.len() as f64 * 0.5).min(1.0);
    let confidence = agreeing_weight / total_weight * damping;

    if confidence >= config.confidence_threshold {
        DimensionOutcome::Labeled {
            label: label.to_string(),
            score: fused_score,
            confidence,
        }
    } else {
        abstain(AbstainReason::BelowConfidenceThreshold, confidence)
    }
}

fn abstain(reason: AbstainReason, confidence: f64) -> DimensionOutcome {
    DimensionOutcome::Abstained { reason, confidence }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use admit_core::LabelMethodId;

    fn vote(method: LabelMethodId, label: &str, score: f64) -> LabelCandidate {
        LabelCandidate::new(method, Dimension::Sentiment, label, score)
    }

    fn fuse(candidates: &[LabelCandidate], configured: usize, available: usize) -> DimensionOutcome {
        fuse_dimension(
            Dimension::Sentiment,
            candidates,
            configured,
            available,
            &LabelingConfig::default(),
        )
    }

    #[test]
    fn test_agreeing_votes_label_with_full_confidence() {
        let votes = vec![
            vote(LabelMethodId::Pattern, "积极", 8.5),
            vote(LabelMethodId::Textblob, "积极", 7.8),
        ];

        let outcome = fuse(&votes, 2, 2);
        match outcome {
            DimensionOutcome::Labeled {
                label,
                score,
                confidence,
            } => {
                assert_eq!(label, "积极");
                assert!((score - 8.15).abs() < 1e-9);
                assert_eq!(confidence, 1.0);
            }
            other => panic!("expected a label, got {other:?}"),
        }
    }

    #[test]
    fn test_split_votes_abstain_instead_of_averaging_to_neutral() {
        // One strongly positive and one strongly negative vote average
        // into neutral territory, but nobody voted neutral
        let votes = vec![
            vote(LabelMethodId::Pattern, "积极", 8.5),
            vote(LabelMethodId::Textblob, "消极", 2.2),
        ];

        let outcome = fuse(&votes, 2, 2);
        assert!(outcome.label().is_none());
        match outcome {
            DimensionOutcome::Abstained { reason, confidence } => {
                assert_eq!(reason, AbstainReason::BelowConfidenceThreshold);
                assert_eq!(confidence, 0.0);
            }
            other => panic!("expected abstention, got {other:?}"),
        }
    }

    #[test]
    fn test_a_single_voter_is_damped_below_the_threshold() {
        let votes = vec![vote(LabelMethodId::Pattern, "积极", 8.5)];

        let outcome = fuse(&votes, 1, 1);
        match outcome {
            DimensionOutcome::Abstained { reason, confidence } => {
                assert_eq!(reason, AbstainReason::BelowConfidenceThreshold);
                assert_eq!(confidence, 0.5);
            }
            other => panic!("expected abstention, got {other:?}"),
        }
    }

    #[test]
    fn test_method_weights_shift_the_outcome() {
        let mut config = LabelingConfig::default();
        config.weights.insert(LabelMethodId::Pattern, 2.0);
        config.weights.insert(LabelMethodId::Textblob, 0.4);

        let votes = vec![
            vote(LabelMethodId::Pattern, "积极", 8.5),
            vote(LabelMethodId::Textblob, "消极", 2.2),
        ];

        let outcome = fuse_dimension(Dimension::Sentiment, &votes, 2, 2, &config);
        match outcome {
            DimensionOutcome::Labeled {
                label, confidence, ..
            } => {
                assert_eq!(label, "积极");
                assert!(confidence > 0.7 && confidence < 1.0);
            }
            other => panic!("expected the heavier vote to win, got {other:?}"),
        }
    }

    #[test]
    fn test_no_configured_methods_abstains_for_lack_of_candidates() {
        let outcome = fuse(&[], 0, 0);
        match outcome {
            DimensionOutcome::Abstained { reason, .. } => {
                assert_eq!(reason, AbstainReason::NoCandidates);
            }
            other => panic!("expected abstention, got {other:?}"),
        }
    }

    #[test]
    fn test_all_methods_down_abstains_as_unavailable() {
        let outcome = fuse(&[], 3, 0);
        match outcome {
            DimensionOutcome::Abstained { reason, .. } => {
                assert_eq!(reason, AbstainReason::MethodUnavailable);
            }
            other => panic!("expected abstention, got {other:?}"),
        }
    }

    #[test]
    fn test_available_methods_without_votes_abstain_for_lack_of_candidates() {
        let outcome = fuse(&[], 2, 2);
        match outcome {
            DimensionOutcome::Abstained { reason, .. } => {
                assert_eq!(reason, AbstainReason::NoCandidates);
            }
            other => panic!("expected abstention, got {other:?}"),
        }
    }

    #[test]
    fn test_votes_for_other_dimensions_are_ignored() {
        let stray = LabelCandidate::new(LabelMethodId::Pattern, Dimension::Difficulty, "难", 7.5);

        let outcome = fuse(&[stray], 1, 1);
        assert!(!outcome.is_labeled());
    }

    #[test]
    fn test_confidence_exactly_at_the_threshold_labels() {
        // Weights 7 and 3 give the winning vote a share of exactly 0.7
        let mut config = LabelingConfig::default();
        config.weights.insert(LabelMethodId::Pattern, 7.0);
        config.weights.insert(LabelMethodId::Textblob, 3.0);

        let votes = vec![
            vote(LabelMethodId::Pattern, "积极", 9.0),
            vote(LabelMethodId::Textblob, "中性", 5.4),
        ];

        let outcome = fuse_dimension(Dimension::Sentiment, &votes, 2, 2, &config);
        match outcome {
            DimensionOutcome::Labeled { confidence, .. } => {
                assert!((confidence - 0.7).abs() < 1e-9);
            }
            other => panic!("expected a label at the threshold, got {other:?}"),
        }
    }
}

//! Multi-signal labeling
//!
//! Runs a configurable ensemble of labeling methods over cleaned post
//! text:
//! - Weighted regex cues with negation and intensity handling
//! - Polarity and valence lexicons (sentiment only)
//! - A remote transformer classifier (sentiment only)
//! - LLM prompting across all three dimensions
//!
//! Each method votes on the dimensions it covers; fusion averages the
//! votes per dimension and either assigns a label or abstains with a
//! recorded reason. There is no default label: a dimension without
//! enough agreement stays unlabeled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use admit_core::{
    AppConfig, CleanPost, Dimension, LabelCandidate, LabelMethod, LabelMethodId, LabeledPost,
    LabelingConfig, LlmClient, ResolvedEntities,
};

/// Hard cap on one method invocation, above the clients' own request
/// timeouts
const METHOD_TIMEOUT: Duration = Duration::from_secs(60);

pub mod fusion;
pub mod lexicon;
pub mod patterns;
pub mod remote;

pub use fusion::fuse_dimension;
pub use lexicon::{PolarityScorer, ValenceScorer};
pub use patterns::CueScorer;
pub use remote::{LlmLabelScorer, NeuralClassifier};

// ============================================================================
// Labeler
// ============================================================================

/// Runs the configured labeling methods and fuses their votes
pub struct Labeler {
    methods: Vec<Box<dyn LabelMethod>>,
    unavailable: Vec<LabelMethodId>,
    config: LabelingConfig,
}

impl Labeler {
    /// Create a labeler with no methods
    pub fn new(config: LabelingConfig) -> Self {
        Self {
            methods: Vec::new(),
            unavailable: Vec::new(),
            config,
        }
    }

    /// Add a labeling method
    pub fn with_method(mut self, method: Box<dyn LabelMethod>) -> Self {
        self.methods.push(method);
        self
    }

    /// Build the method set named in the configuration.
    ///
    /// A method that cannot start (classifier misconfigured, LLM
    /// requested without a client) is remembered as unavailable so its
    /// dimensions can abstain with the right reason.
    pub fn from_config(config: &AppConfig, llm: Option<Arc<dyn LlmClient>>) -> Self {
        let mut labeler = Self::new(config.smart_labeling.clone());

        for method in &config.smart_labeling.methods {
            match method {
                LabelMethodId::Pattern => {
                    labeler = labeler.with_method(Box::new(CueScorer::new()));
                }
                LabelMethodId::Textblob => {
                    labeler = labeler.with_method(Box::new(PolarityScorer::new()));
                }
                LabelMethodId::Vader => {
                    labeler = labeler.with_method(Box::new(ValenceScorer::new()));
                }
                LabelMethodId::Transformers => match NeuralClassifier::from_config(&config.neural)
                {
                    Ok(classifier) => labeler = labeler.with_method(Box::new(classifier)),
                    Err(e) => {
                        tracing::warn!("Transformer labeling unavailable, skipping: {}", e);
                        labeler.unavailable.push(LabelMethodId::Transformers);
                    }
                },
                LabelMethodId::Llm => match llm {
                    Some(ref client) => {
                        labeler =
                            labeler.with_method(Box::new(LlmLabelScorer::new(Arc::clone(client))));
                    }
                    None => {
                        tracing::warn!("LLM labeling requested but no client configured");
                        labeler.unavailable.push(LabelMethodId::Llm);
                    }
                },
            }
        }

        labeler
    }

    /// Identifiers of the methods that will run
    pub fn method_ids(&self) -> Vec<LabelMethodId> {
        self.methods.iter().map(|m| m.id()).collect()
    }

    /// Run every method over the post and fuse the votes per dimension.
    ///
    /// A method failure is logged and counts against availability; the
    /// remaining votes still fuse. Empty posts skip the methods entirely
    /// and abstain everywhere for lack of candidates.
    pub async fn label(&self, post: &CleanPost, entities: ResolvedEntities) -> LabeledPost {
        let mut candidates: Vec<LabelCandidate> = Vec::new();
        let mut responded: Vec<LabelMethodId> = Vec::new();

        if !post.is_empty() {
            let text = post.analysis_text();
            for method in &self.methods {
                match tokio::time::timeout(METHOD_TIMEOUT, method.score(&text)).await {
                    Ok(Ok(votes)) => {
                        tracing::debug!("{} produced {} votes", method.id(), votes.len());
                        responded.push(method.id());
                        candidates.extend(votes);
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("{} labeling failed, skipping: {}", method.id(), e);
                    }
                    Err(_) => {
                        tracing::warn!("{} labeling timed out, skipping", method.id());
                    }
                }
            }
        }

        let outcome = |dimension: Dimension| {
            let configured = self
                .methods
                .iter()
                .filter(|m| m.dimensions().contains(&dimension))
                .count()
                + self
                    .unavailable
                    .iter()
                    .filter(|m| static_dimensions(**m).contains(&dimension))
                    .count();

            // An empty post never ran the methods; count them available
            // so the abstention reads as missing candidates, not as an
            // outage
            let available = if post.is_empty() {
                configured
            } else {
                self.methods
                    .iter()
                    .filter(|m| {
                        m.dimensions().contains(&dimension) && responded.contains(&m.id())
                    })
                    .count()
            };

            fusion::fuse_dimension(dimension, &candidates, configured, available, &self.config)
        };

        LabeledPost {
            id: post.id.clone(),
            entities,
            difficulty: outcome(Dimension::Difficulty),
            course_evaluation: outcome(Dimension::CourseEvaluation),
            sentiment: outcome(Dimension::Sentiment),
            processed_at: Utc::now(),
        }
    }
}

/// Dimension coverage of a method that never got built
fn static_dimensions(method: LabelMethodId) -> &'static [Dimension] {
    match method {
        LabelMethodId::Pattern | LabelMethodId::Llm => &Dimension::ALL,
        LabelMethodId::Textblob | LabelMethodId::Vader | LabelMethodId::Transformers => {
            &[Dimension::Sentiment]
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

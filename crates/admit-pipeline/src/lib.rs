//! Batch coordination across the processing stages.
//!
//! A [`Pipeline`] takes a batch of raw posts through normalization, the
//! language and length filters, duplicate detection, entity extraction
//! and labeling, and reports per-stage counts for the run.
//!
//! Normalization and the duplicate window run serially in input order,
//! so canonical assignments are deterministic: the window has a single
//! writer and each post is appended only after its own verdict. The
//! surviving posts then fan out over an ordered concurrent stream for
//! extraction and labeling, which keeps outcomes in input order without
//! serializing the slow stages.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use admit_core::{
    AppConfig, CleanPost, LlmClient, PostOutcome, ProcessingConfig, RawPost, RunReport,
    SkipReason, StageCounts,
};
use admit_dedup::{DedupOutcome, DedupWindow};
use admit_extract::EntityExtractor;
use admit_label::Labeler;
use admit_normalize::Normalizer;

// ============================================================================
// Batch Result
// ============================================================================

/// Everything one call to [`Pipeline::process`] produces
pub struct BatchResult {
    /// Terminal outcome per input post, in input order
    pub outcomes: Vec<PostOutcome>,
    /// Cleaned record per input post, in input order. Normalization is
    /// total, so this always has one entry per input, including posts
    /// that were filtered or dropped later.
    pub cleaned: Vec<CleanPost>,
    /// Counts and duplicate groups for the run
    pub report: RunReport,
}

/// Where a post landed after the serial phase
enum Staged {
    /// Passed every filter; goes on to extraction and labeling
    Admitted(CleanPost),
    /// Settled early as skipped or duplicate
    Settled(PostOutcome),
    /// Flagged duplicate under `drop_duplicates`
    Dropped,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Coordinates the stage sequence over batches of raw posts
pub struct Pipeline {
    normalizer: Normalizer,
    extractor: EntityExtractor,
    labeler: Labeler,
    config: ProcessingConfig,
}

impl Pipeline {
    pub fn new(
        normalizer: Normalizer,
        extractor: EntityExtractor,
        labeler: Labeler,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            normalizer,
            extractor,
            labeler,
            config,
        }
    }

    /// Build every stage from the application configuration
    pub async fn from_config(config: &AppConfig, llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            normalizer: Normalizer::new(&config.processing),
            extractor: EntityExtractor::from_config(config, llm.clone()).await,
            labeler: Labeler::from_config(config, llm),
            config: config.processing.clone(),
        }
    }

    /// Process one batch of raw posts.
    ///
    /// Outcomes come back in input order, one per input post, except
    /// that flagged duplicates are omitted when `drop_duplicates` is
    /// set. The duplicate window is fresh for each call, so only
    /// members of this batch can match each other and reprocessing the
    /// same batch reproduces the same outcomes.
    pub async fn process(&self, posts: Vec<RawPost>) -> BatchResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut counts = StageCounts {
            input: posts.len(),
            ..StageCounts::default()
        };

        tracing::info!(%run_id, posts = posts.len(), "starting batch");

        // Serial phase: filters and duplicate verdicts in input order
        let mut window = DedupWindow::from_config(&self.config);
        let mut cleaned = Vec::with_capacity(posts.len());
        let mut staged = Vec::with_capacity(posts.len());
        for raw in &posts {
            let clean = self.normalizer.normalize(raw);
            counts.normalized += 1;
            cleaned.push(clean.clone());
            staged.push(self.stage(clean, &mut window, &mut counts));
        }

        // Concurrent phase: extraction and labeling on an ordered stream
        let concurrency = self.config.concurrency.max(1);
        let settled: Vec<Option<PostOutcome>> = stream::iter(staged)
            .map(|entry| async move {
                match entry {
                    Staged::Admitted(post) => Some(self.label_one(post).await),
                    Staged::Settled(outcome) => Some(outcome),
                    Staged::Dropped => None,
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let outcomes: Vec<PostOutcome> = settled.into_iter().flatten().collect();
        for outcome in &outcomes {
            if let PostOutcome::Labeled(post) = outcome {
                if post.labeled_dimensions() > 0 {
                    counts.labeled += 1;
                } else {
                    counts.abstained += 1;
                }
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            counts,
            duplicate_groups: window.into_duplicate_groups(),
        };

        tracing::info!(
            %run_id,
            normalized = report.counts.normalized,
            language_filtered = report.counts.language_filtered,
            invalid_length = report.counts.invalid_length,
            duplicates = report.counts.duplicates,
            labeled = report.counts.labeled,
            abstained = report.counts.abstained,
            "batch finished"
        );

        BatchResult {
            outcomes,
            cleaned,
            report,
        }
    }

    /// Run one cleaned post through the filters and the window
    fn stage(&self, clean: CleanPost, window: &mut DedupWindow, counts: &mut StageCounts) -> Staged {
        if self.config.enable_language_filter
            && clean.language.code() != self.config.target_language
        {
            counts.language_filtered += 1;
            tracing::debug!(
                id = %clean.id,
                language = clean.language.code(),
                "language filtered"
            );
            return Staged::Settled(PostOutcome::Skipped {
                id: clean.id,
                reason: SkipReason::LanguageMismatch,
            });
        }

        if !clean.valid_length {
            counts.invalid_length += 1;
            tracing::debug!(id = %clean.id, "body length out of bounds");
            return Staged::Settled(PostOutcome::Skipped {
                id: clean.id,
                reason: SkipReason::InvalidLength,
            });
        }

        match window.check_and_admit(&clean) {
            DedupOutcome::Duplicate {
                canonical_id,
                similarity,
            } => {
                counts.duplicates += 1;
                tracing::debug!(
                    id = %clean.id,
                    canonical = %canonical_id,
                    similarity,
                    "near-duplicate"
                );
                if self.config.drop_duplicates {
                    Staged::Dropped
                } else {
                    Staged::Settled(PostOutcome::Duplicate {
                        id: clean.id,
                        canonical_id,
                    })
                }
            }
            DedupOutcome::Admitted => {
                counts.extracted += 1;
                Staged::Admitted(clean)
            }
        }
    }

    /// Extraction then labeling for one admitted post
    async fn label_one(&self, post: CleanPost) -> PostOutcome {
        let entities = self.extractor.extract(&post).await;
        PostOutcome::Labeled(self.labeler.label(&post, entities).await)
    }
}

// ============================================================================
// Tests
// ============================================================================

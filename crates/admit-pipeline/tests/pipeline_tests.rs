//! End-to-end batch tests over the public pipeline API.
//!
//! Everything here runs the default offline method set; no network or
//! database is needed.

use admit_core::{AppConfig, GazetteerEntry, PostOutcome, RawPost};
use admit_pipeline::Pipeline;

fn post(id: &str, title: &str, body: &str) -> RawPost {
    RawPost::new(id, "gradadmissions", title, body)
}

// ============================================================================
// Duplicate Handling Across a Batch
// ============================================================================

#[tokio::test]
async fn test_exact_duplicate_found_across_intervening_posts() {
    let pipeline = Pipeline::from_config(&AppConfig::default(), None).await;
    let result = pipeline
        .process(vec![
            post(
                "t3_a",
                "Accepted to Stanford",
                "I am excited to join the computer science program there in the fall.",
            ),
            post(
                "t3_b",
                "Rejected from my dream school",
                "Feeling pretty devastated about the whole thing, not sure what to do next.",
            ),
            post(
                "t3_c",
                "Accepted  to  Stanford",
                "I am excited to join the computer science  program there in the fall.",
            ),
        ])
        .await;

    assert_eq!(result.outcomes.len(), 3);
    match &result.outcomes[2] {
        PostOutcome::Duplicate { id, canonical_id } => {
            assert_eq!(id, "t3_c");
            assert_eq!(canonical_id, "t3_a");
        }
        other => panic!("expected duplicate outcome, got {other:?}"),
    }
    assert_eq!(result.report.counts.duplicates, 1);
    assert_eq!(result.report.duplicate_groups.len(), 1);
    assert_eq!(result.report.duplicate_groups[0].canonical_id, "t3_a");
}

// ============================================================================
// Configuration Threading
// ============================================================================

#[tokio::test]
async fn test_disabled_language_filter_admits_other_languages() {
    let mut config = AppConfig::default();
    config.processing.enable_language_filter = false;
    let pipeline = Pipeline::from_config(&config, None).await;

    let result = pipeline
        .process(vec![post(
            "t3_zh",
            "请教申请建议",
            "我正在准备美国研究生申请，想请大家分享一些经验和建议，非常感谢。",
        )])
        .await;

    assert_eq!(result.report.counts.language_filtered, 0);
    assert_eq!(result.report.counts.extracted, 1);
    assert!(matches!(&result.outcomes[0], PostOutcome::Labeled(_)));
}

#[tokio::test]
async fn test_config_gazetteer_extension_resolves() {
    let mut config = AppConfig::default();
    config.gazetteer.universities.push(GazetteerEntry {
        canonical: "ETH Zurich".to_string(),
        variants: vec!["eth zurich".to_string(), "eth".to_string()],
    });
    let pipeline = Pipeline::from_config(&config, None).await;

    let result = pipeline
        .process(vec![post(
            "t3_eth",
            "Admitted to ETH Zurich",
            "I will be moving to Switzerland for my masters degree next autumn.",
        )])
        .await;

    match &result.outcomes[0] {
        PostOutcome::Labeled(labeled) => {
            let university = labeled
                .entities
                .university
                .as_ref()
                .expect("resolved university");
            assert_eq!(university.value, "ETH Zurich");
        }
        other => panic!("expected labeled outcome, got {other:?}"),
    }
}

// ============================================================================
// Ordering Under Concurrency
// ============================================================================

#[tokio::test]
async fn test_outcomes_identical_across_concurrency_levels() {
    let batch = || {
        vec![
            post(
                "t3_a",
                "Just got accepted into MIT for Computer Science PhD!",
                "Still can't believe it. So excited and grateful to everyone who helped.",
            ),
            post(
                "t3_b",
                "Rejected from my dream school",
                "Feeling pretty devastated about the whole thing, not sure what to do next.",
            ),
            post(
                "t3_c",
                "Waitlisted at Berkeley",
                "Trying to stay hopeful while I wait for the final decision to come through.",
            ),
        ]
    };

    let mut serial_config = AppConfig::default();
    serial_config.processing.concurrency = 1;
    let serial = Pipeline::from_config(&serial_config, None)
        .await
        .process(batch())
        .await;

    let mut wide_config = AppConfig::default();
    wide_config.processing.concurrency = 8;
    let wide = Pipeline::from_config(&wide_config, None)
        .await
        .process(batch())
        .await;

    assert_eq!(serial.report.counts, wide.report.counts);
    let serial_ids: Vec<&str> = serial.outcomes.iter().map(|o| o.id()).collect();
    let wide_ids: Vec<&str> = wide.outcomes.iter().map(|o| o.id()).collect();
    assert_eq!(serial_ids, wide_ids);

    for (a, b) in serial.outcomes.iter().zip(&wide.outcomes) {
        match (a, b) {
            (PostOutcome::Labeled(x), PostOutcome::Labeled(y)) => assert!(x.same_outcome(y)),
            (a, b) => panic!("outcome shape differs between runs: {a:?} vs {b:?}"),
        }
    }
}

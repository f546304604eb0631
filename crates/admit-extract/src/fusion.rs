//! Candidate fusion: many weak votes in, at most one value per kind out.
//!
//! Candidates are grouped by a case- and whitespace-insensitive key and
//! their confidences aggregated. The winning group must clear the
//! resolution floor or the kind stays unresolved; a guess is never
//! fabricated. Ties fall to the higher-precision method, then to the
//! lexicographically smaller key, so resolution does not depend on the
//! order candidates arrive in.

use std::collections::HashMap;

use admit_core::{
    AggregateMode, EntityCandidate, EntityKind, ExtractionConfig, ResolvedEntities, ResolvedEntity,
};

/// Case- and whitespace-insensitive grouping key
pub fn canonical_key(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

struct Group {
    key: String,
    /// Value as written by the group's highest-precision candidate
    display: String,
    best_priority: u8,
    aggregate: f64,
}

/// Fuse all candidates into one resolution per entity kind
pub fn resolve(candidates: &[EntityCandidate], config: &ExtractionConfig) -> ResolvedEntities {
    let mut resolved = ResolvedEntities::default();

    for kind in EntityKind::ALL {
        let of_kind: Vec<&EntityCandidate> =
            candidates.iter().filter(|c| c.kind == kind).collect();
        if let Some(entity) = resolve_kind(of_kind, config) {
            resolved.set(kind, entity);
        }
    }

    resolved
}

fn resolve_kind(
    mut candidates: Vec<&EntityCandidate>,
    config: &ExtractionConfig,
) -> Option<ResolvedEntity> {
    if candidates.is_empty() {
        return None;
    }

    // Canonical accumulation order. Float sums are not associative, so
    // summing in input order would make equal candidate sets disagree at
    // the last bit.
    candidates.sort_by(|a, b| {
        a.method
            .priority()
            .cmp(&b.method.priority())
            .then(b.confidence.total_cmp(&a.confidence))
            .then(a.normalized_value.cmp(&b.normalized_value))
    });

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let key = canonical_key(&candidate.normalized_value);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                key,
                display: candidate.normalized_value.clone(),
                best_priority: candidate.method.priority(),
                aggregate: 0.0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        match config.aggregate {
            AggregateMode::Sum => group.aggregate += candidate.confidence,
            AggregateMode::Max => group.aggregate = group.aggregate.max(candidate.confidence),
        }
    }

    groups.sort_by(|a, b| {
        b.aggregate
            .total_cmp(&a.aggregate)
            .then(a.best_priority.cmp(&b.best_priority))
            .then(a.key.cmp(&b.key))
    });

    let winner = &groups[0];
    if winner.aggregate < config.resolution_floor {
        return None;
    }

    Some(ResolvedEntity {
        value: winner.display.clone(),
        confidence: winner.aggregate.min(1.0),
    })
}

// ============================================================================
// Tests
// ============================================================================

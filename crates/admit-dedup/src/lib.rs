//! Near-duplicate detection over a bounded recent window
//!
//! Two-stage check per post: exact content-hash lookup, then fuzzy
//! similarity against every window member. The window is FIFO-bounded,
//! so each post costs at most `capacity` comparisons instead of a
//! quadratic pass over the corpus; posts that age out can no longer be
//! matched.

use std::collections::{HashMap, VecDeque};

use admit_core::{CleanPost, DuplicateGroup, ProcessingConfig};

pub mod similarity;

pub use similarity::text_similarity;

// ============================================================================
// Outcome
// ============================================================================

/// Verdict for one post checked against the window
#[derive(Debug, Clone, PartialEq)]
pub enum DedupOutcome {
    /// First sighting; the post joined the window
    Admitted,
    /// Near-match of an earlier post still in the window
    Duplicate {
        canonical_id: String,
        similarity: f64,
    },
}

// ============================================================================
// Window
// ============================================================================

struct WindowEntry {
    id: String,
    content_hash: String,
    text: String,
}

/// Bounded FIFO window of recently admitted posts.
///
/// Single-writer: the pipeline coordinator owns the window, checks
/// posts in input order, and appends each admitted post only after its
/// verdict is decided. The first post of a group is canonical; later
/// near-matches are flagged against it.
pub struct DedupWindow {
    window: VecDeque<WindowEntry>,
    /// content_hash -> canonical post id for every window member
    hash_index: HashMap<String, String>,
    capacity: usize,
    similarity_threshold: f64,
    groups: Vec<DuplicateGroup>,
    group_index: HashMap<String, usize>,
}

impl DedupWindow {
    pub fn new(capacity: usize, similarity_threshold: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            hash_index: HashMap::new(),
            capacity,
            similarity_threshold,
            groups: Vec::new(),
            group_index: HashMap::new(),
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.dedup_window, config.similarity_threshold)
    }

    /// Check a post against the window; admit it if it is the first of
    /// its kind.
    pub fn check_and_admit(&mut self, post: &CleanPost) -> DedupOutcome {
        // Stage (a): exact content hash
        if let Some(canonical_id) = self.hash_index.get(&post.content_hash).cloned() {
            tracing::debug!("{} is an exact duplicate of {}", post.id, canonical_id);
            self.flag(&canonical_id, &post.id);
            return DedupOutcome::Duplicate {
                canonical_id,
                similarity: 1.0,
            };
        }

        // Stage (b): fuzzy similarity against every window member
        let text = post.analysis_text();
        let hit = self.window.iter().find_map(|entry| {
            let similarity = similarity::text_similarity(&text, &entry.text);
            (similarity >= self.similarity_threshold).then(|| (entry.id.clone(), similarity))
        });

        if let Some((canonical_id, similarity)) = hit {
            tracing::debug!(
                "{} is a near-duplicate of {} (similarity {:.3})",
                post.id,
                canonical_id,
                similarity
            );
            self.flag(&canonical_id, &post.id);
            return DedupOutcome::Duplicate {
                canonical_id,
                similarity,
            };
        }

        self.admit(post, text);
        DedupOutcome::Admitted
    }

    /// Append after the verdict; evicts the oldest entries past capacity
    fn admit(&mut self, post: &CleanPost, text: String) {
        if self.capacity == 0 {
            return;
        }

        while self.window.len() >= self.capacity {
            if let Some(evicted) = self.window.pop_front() {
                self.hash_index.remove(&evicted.content_hash);
            }
        }

        self.hash_index
            .insert(post.content_hash.clone(), post.id.clone());
        self.window.push_back(WindowEntry {
            id: post.id.clone(),
            content_hash: post.content_hash.clone(),
            text,
        });
    }

    fn flag(&mut self, canonical_id: &str, duplicate_id: &str) {
        let slot = match self.group_index.get(canonical_id) {
            Some(&slot) => slot,
            None => {
                self.groups.push(DuplicateGroup {
                    canonical_id: canonical_id.to_string(),
                    duplicate_ids: Vec::new(),
                });
                self.group_index
                    .insert(canonical_id.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[slot].duplicate_ids.push(duplicate_id.to_string());
    }

    /// Groups flagged so far, in first-flag order
    pub fn duplicate_groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Consume the window, keeping only the accumulated groups
    pub fn into_duplicate_groups(self) -> Vec<DuplicateGroup> {
        self.groups
    }

    /// Posts currently held in the window
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

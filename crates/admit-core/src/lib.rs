//! Core domain models and shared types for the admit pipeline.
//!
//! This crate defines the abstractions used throughout the system:
//! - Post records at each pipeline stage (raw, cleaned, labeled)
//! - Entity and label candidates produced by the individual methods
//! - Fixed label vocabularies with their numeric anchors
//! - Common error types
//! - Capability traits implemented by extraction and labeling methods
//! - Configuration management

pub mod config;

pub use config::{
    AggregateMode, AppConfig, ConfigError, DatabaseConfig, ExtractionConfig, GazetteerConfig,
    GazetteerEntry, LabelingConfig, LlmConfig, LlmProvider, LoggingConfig, NeuralConfig,
    ProcessingConfig, RedditConfig, SemanticConfig,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for pipeline operations
#[derive(Error, Debug)]
pub enum AdmitError {
    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Labeling error: {0}")]
    LabelingError(String),

    #[error("Method unavailable: {0}")]
    MethodUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for AdmitError {
    fn from(e: ConfigError) -> Self {
        Self::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdmitError>;

// ============================================================================
// Post Records
// ============================================================================

/// A post as fetched from the source platform.
///
/// Created by the fetch layer; never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    /// Platform-assigned identifier, opaque and unique
    pub id: String,

    /// Subreddit the post was fetched from
    pub subreddit: String,

    /// Post title
    pub title: String,

    /// Post body (selftext)
    pub body: String,

    /// Top-level comments in reply order
    pub comments: Vec<String>,

    /// Vote score at fetch time
    pub score: i64,

    /// Creation time reported by the platform
    pub created_utc: Option<DateTime<Utc>>,
}

impl RawPost {
    /// Create a raw post with empty comments
    pub fn new(
        id: impl Into<String>,
        subreddit: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subreddit: subreddit.into(),
            title: title.into(),
            body: body.into(),
            comments: Vec::new(),
            score: 0,
            created_utc: None,
        }
    }

    /// Attach comments
    pub fn with_comments(mut self, comments: Vec<String>) -> Self {
        self.comments = comments;
        self
    }

    /// Set the vote score
    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }
}

/// Language detected for a cleaned post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
    Ja,
    Ko,
    Ru,
    Unknown,
}

impl Language {
    /// ISO-style code used in config and storage
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Ru => "ru",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.to_lowercase().as_str() {
            "en" => Self::En,
            "zh" => Self::Zh,
            "ja" => Self::Ja,
            "ko" => Self::Ko,
            "ru" => Self::Ru,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Output of the normalizer.
///
/// Derived exactly once from a [`RawPost`]; immutable thereafter. Comments
/// are cleaned and folded into `body` in reply order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanPost {
    pub id: String,

    pub subreddit: String,

    /// Title after cleaning, original case preserved
    pub title: String,

    /// Body plus comments after cleaning
    pub body: String,

    /// Detected language
    pub language: Language,

    /// SHA-256 hex digest of the cleaned title and body, used for
    /// exact-duplicate detection
    pub content_hash: String,

    /// Body length within the configured content-length bounds
    pub valid_length: bool,
}

impl CleanPost {
    /// Combined text the extraction and labeling methods run over
    pub fn analysis_text(&self) -> String {
        if self.title.is_empty() {
            self.body.clone()
        } else if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.body)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }
}

// ============================================================================
// Entity Resolution Types
// ============================================================================

/// Entity categories resolved per post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    University,
    Major,
    Program,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::University, Self::Major, Self::Program];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::University => write!(f, "university"),
            Self::Major => write!(f, "major"),
            Self::Program => write!(f, "program"),
        }
    }
}

/// Extraction method identifiers.
///
/// The names match the analyzers of the deployment this system replaces
/// (`spacy` is the statistical NER slot), so existing config files keep
/// working unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMethodId {
    Keyword,
    Pattern,
    Spacy,
    Semantic,
    Llm,
}

impl ExtractMethodId {
    pub const ALL: [ExtractMethodId; 5] = [
        Self::Keyword,
        Self::Pattern,
        Self::Spacy,
        Self::Semantic,
        Self::Llm,
    ];

    /// Fixed precision rank used for fusion tie-breaks; lower wins.
    ///
    /// Gazetteer hits are narrow but precise, context patterns broader,
    /// the NER tagger and semantic matcher progressively noisier.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Keyword => 0,
            Self::Pattern => 1,
            Self::Spacy => 2,
            Self::Semantic => 3,
            Self::Llm => 4,
        }
    }
}

impl std::fmt::Display for ExtractMethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword => write!(f, "keyword"),
            Self::Pattern => write!(f, "pattern"),
            Self::Spacy => write!(f, "spacy"),
            Self::Semantic => write!(f, "semantic"),
            Self::Llm => write!(f, "llm"),
        }
    }
}

/// One extraction hit produced by a single method.
///
/// Ephemeral: exists only during resolution, never persisted individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCandidate {
    /// Method that produced the hit
    pub method: ExtractMethodId,

    /// Entity category
    pub kind: EntityKind,

    /// Text span as matched
    pub raw_span: String,

    /// Canonicalized name
    pub normalized_value: String,

    /// Method-assigned confidence in [0, 1]
    pub confidence: f64,
}

impl EntityCandidate {
    pub fn new(
        method: ExtractMethodId,
        kind: EntityKind,
        raw_span: impl Into<String>,
        normalized_value: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            method,
            kind,
            raw_span: raw_span.into(),
            normalized_value: normalized_value.into(),
            confidence,
        }
    }
}

/// A resolved value for one entity kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub value: String,

    /// Winning aggregate confidence, clamped to [0, 1]
    pub confidence: f64,
}

/// Per-post resolution result, one optional slot per entity kind.
///
/// A `None` slot means no candidate won; confidence is never fabricated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntities {
    pub university: Option<ResolvedEntity>,
    pub major: Option<ResolvedEntity>,
    pub program: Option<ResolvedEntity>,
}

impl ResolvedEntities {
    pub fn get(&self, kind: EntityKind) -> Option<&ResolvedEntity> {
        match kind {
            EntityKind::University => self.university.as_ref(),
            EntityKind::Major => self.major.as_ref(),
            EntityKind::Program => self.program.as_ref(),
        }
    }

    pub fn set(&mut self, kind: EntityKind, entity: ResolvedEntity) {
        match kind {
            EntityKind::University => self.university = Some(entity),
            EntityKind::Major => self.major = Some(entity),
            EntityKind::Program => self.program = Some(entity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.university.is_none() && self.major.is_none() && self.program.is_none()
    }
}

// ============================================================================
// Label Vocabularies
// ============================================================================

/// Labeling dimensions, each with a fixed ordered vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Difficulty,
    CourseEvaluation,
    Sentiment,
}

/// A vocabulary label with its representative score on the shared 0-10 scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelAnchor {
    pub label: &'static str,
    pub score: f64,
}

const DIFFICULTY_SCALE: [LabelAnchor; 4] = [
    LabelAnchor { label: "极难", score: 9.5 },
    LabelAnchor { label: "难", score: 7.5 },
    LabelAnchor { label: "中等", score: 5.0 },
    LabelAnchor { label: "易", score: 2.5 },
];

const COURSE_SCALE: [LabelAnchor; 4] = [
    LabelAnchor { label: "优秀", score: 9.0 },
    LabelAnchor { label: "良好", score: 7.5 },
    LabelAnchor { label: "一般", score: 5.0 },
    LabelAnchor { label: "差", score: 2.5 },
];

const SENTIMENT_SCALE: [LabelAnchor; 3] = [
    LabelAnchor { label: "积极", score: 8.5 },
    LabelAnchor { label: "中性", score: 5.0 },
    LabelAnchor { label: "消极", score: 1.5 },
];

impl Dimension {
    pub const ALL: [Dimension; 3] = [Self::Difficulty, Self::CourseEvaluation, Self::Sentiment];

    /// Ordered vocabulary for this dimension, strongest label first
    pub fn scale(&self) -> &'static [LabelAnchor] {
        match self {
            Self::Difficulty => &DIFFICULTY_SCALE,
            Self::CourseEvaluation => &COURSE_SCALE,
            Self::Sentiment => &SENTIMENT_SCALE,
        }
    }

    /// Map a 0-10 score to the nearest label bucket.
    ///
    /// Equidistant scores resolve to the earlier (stronger) label so the
    /// mapping is deterministic.
    pub fn bucket(&self, score: f64) -> &'static str {
        let mut best = self.scale()[0];
        let mut best_distance = (score - best.score).abs();
        for anchor in &self.scale()[1..] {
            let distance = (score - anchor.score).abs();
            if distance < best_distance {
                best = *anchor;
                best_distance = distance;
            }
        }
        best.label
    }

    /// Representative score for a label, if it belongs to this vocabulary
    pub fn anchor_score(&self, label: &str) -> Option<f64> {
        self.scale()
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.score)
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Difficulty => write!(f, "difficulty"),
            Self::CourseEvaluation => write!(f, "course_evaluation"),
            Self::Sentiment => write!(f, "sentiment"),
        }
    }
}

// ============================================================================
// Labeling Types
// ============================================================================

/// Labeling method identifiers.
///
/// As with [`ExtractMethodId`], the names stay compatible with the earlier
/// deployment's analyzer names (`textblob`, `vader`, `transformers`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMethodId {
    Pattern,
    Textblob,
    Vader,
    Transformers,
    Llm,
}

impl LabelMethodId {
    pub const ALL: [LabelMethodId; 5] = [
        Self::Pattern,
        Self::Textblob,
        Self::Vader,
        Self::Transformers,
        Self::Llm,
    ];
}

impl std::fmt::Display for LabelMethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern => write!(f, "pattern"),
            Self::Textblob => write!(f, "textblob"),
            Self::Vader => write!(f, "vader"),
            Self::Transformers => write!(f, "transformers"),
            Self::Llm => write!(f, "llm"),
        }
    }
}

/// One method's vote for one dimension. Ephemeral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCandidate {
    pub method: LabelMethodId,

    pub dimension: Dimension,

    /// Label from the dimension's fixed vocabulary
    pub label: String,

    /// Score on the shared 0-10 scale
    pub score: f64,
}

impl LabelCandidate {
    pub fn new(
        method: LabelMethodId,
        dimension: Dimension,
        label: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            method,
            dimension,
            label: label.into(),
            score,
        }
    }
}

/// Reasons a dimension is left without a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstainReason {
    /// Fused confidence stayed below the configured threshold
    BelowConfidenceThreshold,
    /// No enabled method produced a candidate for this dimension
    NoCandidates,
    /// Every method configured for this dimension was unavailable
    MethodUnavailable,
}

impl AbstainReason {
    /// Wire tag as persisted and reported
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BelowConfidenceThreshold => "below_confidence_threshold",
            Self::NoCandidates => "no_candidates",
            Self::MethodUnavailable => "method_unavailable",
        }
    }
}

impl std::fmt::Display for AbstainReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fusion outcome for one dimension of one post.
///
/// Abstention is explicit and terminal, distinct from any default or
/// neutral label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DimensionOutcome {
    Labeled {
        label: String,
        score: f64,
        confidence: f64,
    },
    Abstained {
        reason: AbstainReason,
        confidence: f64,
    },
}

impl DimensionOutcome {
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Labeled { label, .. } => Some(label),
            Self::Abstained { .. } => None,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Self::Labeled { confidence, .. } | Self::Abstained { confidence, .. } => *confidence,
        }
    }

    pub fn is_labeled(&self) -> bool {
        matches!(self, Self::Labeled { .. })
    }
}

/// Final record for one post: resolved entities plus one outcome per
/// dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledPost {
    pub id: String,

    pub entities: ResolvedEntities,

    pub difficulty: DimensionOutcome,

    pub course_evaluation: DimensionOutcome,

    pub sentiment: DimensionOutcome,

    pub processed_at: DateTime<Utc>,
}

impl LabeledPost {
    pub fn outcome(&self, dimension: Dimension) -> &DimensionOutcome {
        match dimension {
            Dimension::Difficulty => &self.difficulty,
            Dimension::CourseEvaluation => &self.course_evaluation,
            Dimension::Sentiment => &self.sentiment,
        }
    }

    pub fn labeled_dimensions(&self) -> usize {
        Dimension::ALL
            .iter()
            .filter(|d| self.outcome(**d).is_labeled())
            .count()
    }

    /// Semantic equality for reprocessing: same labels, scores, confidences
    /// and entity resolutions. `processed_at` is run metadata and not
    /// compared.
    pub fn same_outcome(&self, other: &LabeledPost) -> bool {
        self.id == other.id
            && self.entities == other.entities
            && self.difficulty == other.difficulty
            && self.course_evaluation == other.course_evaluation
            && self.sentiment == other.sentiment
    }
}

// ============================================================================
// Batch Types
// ============================================================================

/// Why a post was excluded before labeling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Detected language differs from the configured target
    LanguageMismatch,
    /// Cleaned body outside the configured length bounds
    InvalidLength,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LanguageMismatch => "language_mismatch",
            Self::InvalidLength => "invalid_length",
        }
    }
}

/// Terminal outcome for one post in a batch pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PostOutcome {
    /// Reached label fusion; abstentions are recorded per dimension
    Labeled(LabeledPost),
    /// Flagged near-duplicate of an earlier canonical post
    Duplicate { id: String, canonical_id: String },
    /// Excluded before extraction
    Skipped { id: String, reason: SkipReason },
}

impl PostOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Labeled(post) => &post.id,
            Self::Duplicate { id, .. } | Self::Skipped { id, .. } => id,
        }
    }
}

/// Posts judged near-identical within the dedup window.
///
/// The canonical member is the first seen; the relation is pairwise within
/// a bounded window and not guaranteed transitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub canonical_id: String,
    pub duplicate_ids: Vec<String>,
}

/// Per-stage counters for one batch pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    /// Raw posts handed to the pipeline
    pub input: usize,

    /// Posts that produced a cleaned record
    pub normalized: usize,

    /// Excluded by the language filter
    pub language_filtered: usize,

    /// Excluded by the content-length bounds
    pub invalid_length: usize,

    /// Flagged as near-duplicates
    pub duplicates: usize,

    /// Posts that reached entity extraction
    pub extracted: usize,

    /// Posts with at least one labeled dimension
    pub labeled: usize,

    /// Posts that reached fusion but abstained on every dimension
    pub abstained: usize,
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    pub counts: StageCounts,

    pub duplicate_groups: Vec<DuplicateGroup>,
}

// ============================================================================
// Traits
// ============================================================================

/// One entity-extraction technique.
///
/// Implementations are built once per run, read-only afterwards, and safe
/// to share across workers. A failing or timed-out method returns an error
/// and simply contributes no candidates.
#[async_trait::async_trait]
pub trait ExtractionMethod: Send + Sync {
    /// Identifier, used for priority ranking and logs
    fn id(&self) -> ExtractMethodId;

    /// Produce zero or more candidates over the cleaned text
    async fn candidates(&self, text: &str) -> Result<Vec<EntityCandidate>>;
}

/// One labeling technique.
///
/// A method votes only on the dimensions it can actually score.
#[async_trait::async_trait]
pub trait LabelMethod: Send + Sync {
    /// Identifier, used for weight lookup and logs
    fn id(&self) -> LabelMethodId;

    /// Dimensions this method votes on
    fn dimensions(&self) -> &'static [Dimension];

    /// Produce at most one candidate per supported dimension
    async fn score(&self, text: &str) -> Result<Vec<LabelCandidate>>;
}

/// Completion backend shared by the llm extraction and labeling methods.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt, return the raw text answer.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_nearest_anchor() {
        assert_eq!(Dimension::Difficulty.bucket(9.0), "极难");
        assert_eq!(Dimension::Difficulty.bucket(6.9), "难");
        assert_eq!(Dimension::Difficulty.bucket(4.8), "中等");
        assert_eq!(Dimension::Difficulty.bucket(1.0), "易");
        assert_eq!(Dimension::Sentiment.bucket(8.0), "积极");
        assert_eq!(Dimension::Sentiment.bucket(2.0), "消极");
    }

    #[test]
    fn test_bucket_equidistant_prefers_stronger() {
        // 8.5 sits exactly between 9.5 and 7.5
        assert_eq!(Dimension::Difficulty.bucket(8.5), "极难");
        // 3.25 sits exactly between 5.0 and 1.5
        assert_eq!(Dimension::Sentiment.bucket(3.25), "中性");
    }

    #[test]
    fn test_anchor_score_lookup() {
        assert_eq!(Dimension::CourseEvaluation.anchor_score("优秀"), Some(9.0));
        assert_eq!(Dimension::CourseEvaluation.anchor_score("missing"), None);
    }

    #[test]
    fn test_method_priority_order() {
        let ranks: Vec<u8> = ExtractMethodId::ALL.iter().map(|m| m.priority()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(ranks, sorted);
        assert!(ExtractMethodId::Keyword.priority() < ExtractMethodId::Pattern.priority());
        assert!(ExtractMethodId::Pattern.priority() < ExtractMethodId::Spacy.priority());
        assert!(ExtractMethodId::Spacy.priority() < ExtractMethodId::Semantic.priority());
    }

    #[test]
    fn test_method_id_wire_names() {
        assert_eq!(
            serde_json::to_string(&ExtractMethodId::Spacy).unwrap(),
            "\"spacy\""
        );
        assert_eq!(
            serde_json::to_string(&LabelMethodId::Transformers).unwrap(),
            "\"transformers\""
        );
        let parsed: Vec<LabelMethodId> =
            serde_json::from_str("[\"pattern\", \"textblob\", \"vader\"]").unwrap();
        assert_eq!(
            parsed,
            vec![
                LabelMethodId::Pattern,
                LabelMethodId::Textblob,
                LabelMethodId::Vader
            ]
        );
    }

    #[test]
    fn test_abstain_reason_tags() {
        assert_eq!(
            AbstainReason::BelowConfidenceThreshold.as_str(),
            "below_confidence_threshold"
        );
        assert_eq!(
            serde_json::to_string(&AbstainReason::NoCandidates).unwrap(),
            "\"no_candidates\""
        );
    }

    #[test]
    fn test_same_outcome_ignores_processed_at() {
        let entities = ResolvedEntities {
            university: Some(ResolvedEntity {
                value: "MIT".to_string(),
                confidence: 1.0,
            }),
            ..Default::default()
        };
        let outcome = DimensionOutcome::Labeled {
            label: "难".to_string(),
            score: 7.2,
            confidence: 0.85,
        };
        let abstained = DimensionOutcome::Abstained {
            reason: AbstainReason::NoCandidates,
            confidence: 0.0,
        };

        let a = LabeledPost {
            id: "t3_abc".to_string(),
            entities: entities.clone(),
            difficulty: outcome.clone(),
            course_evaluation: abstained.clone(),
            sentiment: outcome.clone(),
            processed_at: Utc::now(),
        };
        let mut b = a.clone();
        b.processed_at = Utc::now();
        assert!(a.same_outcome(&b));

        b.sentiment = abstained;
        assert!(!a.same_outcome(&b));
    }

    #[test]
    fn test_resolved_entities_slots() {
        let mut entities = ResolvedEntities::default();
        assert!(entities.is_empty());

        entities.set(
            EntityKind::Major,
            ResolvedEntity {
                value: "Computer Science".to_string(),
                confidence: 0.9,
            },
        );
        assert!(!entities.is_empty());
        assert_eq!(
            entities.get(EntityKind::Major).map(|e| e.value.as_str()),
            Some("Computer Science")
        );
        assert!(entities.get(EntityKind::University).is_none());
    }

    #[test]
    fn test_analysis_text_joins_title_and_body() {
        let post = CleanPost {
            id: "t3_x".to_string(),
            subreddit: "gradadmissions".to_string(),
            title: "Got into Stanford".to_string(),
            body: "So excited to start".to_string(),
            language: Language::En,
            content_hash: "deadbeef".to_string(),
            valid_length: true,
        };
        assert_eq!(post.analysis_text(), "Got into Stanford So excited to start");

        let empty_body = CleanPost {
            body: String::new(),
            ..post
        };
        assert_eq!(empty_body.analysis_text(), "Got into Stanford");
    }
}

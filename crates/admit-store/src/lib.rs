//! PostgreSQL persistence.
//!
//! One wide `posts` table keyed by `post_id` holds the raw record as
//! fetched, the cleaned fields, the duplicate verdict and every label
//! column; a `runs` table records per-batch stage counts. All writes go
//! through idempotent upserts or keyed updates, so refetching or
//! reprocessing a post never produces a second row.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use admit_core::{
    AdmitError, CleanPost, DatabaseConfig, DimensionOutcome, LabeledPost, PostOutcome, RawPost,
    Result, RunReport,
};

// ============================================================================
// Status Values
// ============================================================================

pub const STATUS_UNPROCESSED: &str = "unprocessed";
pub const STATUS_PROCESSED: &str = "processed";
pub const STATUS_SKIPPED: &str = "skipped";
pub const STATUS_DUPLICATE: &str = "duplicate";

// ============================================================================
// Schema
// ============================================================================

const CREATE_POSTS: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    post_id                 TEXT PRIMARY KEY,
    subreddit               TEXT NOT NULL,
    title                   TEXT NOT NULL,
    body                    TEXT NOT NULL,
    comments                TEXT[] NOT NULL DEFAULT '{}',
    score                   BIGINT NOT NULL DEFAULT 0,
    created_utc             TIMESTAMPTZ,
    fetched_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    clean_title             TEXT,
    clean_body              TEXT,
    language                TEXT,
    content_hash            TEXT,
    valid_length            BOOLEAN,
    duplicate_of            TEXT,

    status                  TEXT NOT NULL DEFAULT 'unprocessed',
    skip_reason             TEXT,

    university              TEXT,
    university_confidence   DOUBLE PRECISION,
    major                   TEXT,
    major_confidence        DOUBLE PRECISION,
    program                 TEXT,
    program_confidence      DOUBLE PRECISION,

    difficulty_label        TEXT,
    difficulty_score        DOUBLE PRECISION,
    difficulty_confidence   DOUBLE PRECISION,
    difficulty_reason       TEXT,
    course_label            TEXT,
    course_score            DOUBLE PRECISION,
    course_confidence       DOUBLE PRECISION,
    course_reason           TEXT,
    sentiment_label         TEXT,
    sentiment_score         DOUBLE PRECISION,
    sentiment_confidence    DOUBLE PRECISION,
    sentiment_reason        TEXT,

    processed_at            TIMESTAMPTZ
)
"#;

const CREATE_RUNS: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    run_id              UUID PRIMARY KEY,
    started_at          TIMESTAMPTZ NOT NULL,
    finished_at         TIMESTAMPTZ NOT NULL,
    input               BIGINT NOT NULL,
    normalized          BIGINT NOT NULL,
    language_filtered   BIGINT NOT NULL,
    invalid_length      BIGINT NOT NULL,
    duplicates          BIGINT NOT NULL,
    extracted           BIGINT NOT NULL,
    labeled             BIGINT NOT NULL,
    abstained           BIGINT NOT NULL
)
"#;

const CREATE_STATUS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS posts_status_idx ON posts (status)";

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct RawPostRow {
    post_id: String,
    subreddit: String,
    title: String,
    body: String,
    comments: Vec<String>,
    score: i64,
    created_utc: Option<DateTime<Utc>>,
}

impl From<RawPostRow> for RawPost {
    fn from(row: RawPostRow) -> Self {
        RawPost {
            id: row.post_id,
            subreddit: row.subreddit,
            title: row.title,
            body: row.body,
            comments: row.comments,
            score: row.score,
            created_utc: row.created_utc,
        }
    }
}

/// One line of the JSONL export
#[derive(Debug, FromRow, Serialize)]
struct ExportRow {
    post_id: String,
    subreddit: String,
    title: String,
    clean_body: Option<String>,
    language: Option<String>,
    university: Option<String>,
    university_confidence: Option<f64>,
    major: Option<String>,
    major_confidence: Option<f64>,
    program: Option<String>,
    program_confidence: Option<f64>,
    difficulty_label: Option<String>,
    difficulty_score: Option<f64>,
    difficulty_confidence: Option<f64>,
    difficulty_reason: Option<String>,
    course_label: Option<String>,
    course_score: Option<f64>,
    course_confidence: Option<f64>,
    course_reason: Option<String>,
    sentiment_label: Option<String>,
    sentiment_score: Option<f64>,
    sentiment_confidence: Option<f64>,
    sentiment_reason: Option<String>,
    processed_at: Option<DateTime<Utc>>,
}

const EXPORT_COLUMNS: &str = "post_id, subreddit, title, clean_body, language, \
     university, university_confidence, major, major_confidence, \
     program, program_confidence, \
     difficulty_label, difficulty_score, difficulty_confidence, difficulty_reason, \
     course_label, course_score, course_confidence, course_reason, \
     sentiment_label, sentiment_score, sentiment_confidence, sentiment_reason, \
     processed_at";

/// Label, score, confidence and abstain-reason columns for one
/// dimension outcome. Abstentions keep their confidence and reason
/// tag but store no label or score.
fn dimension_columns(outcome: &DimensionOutcome) -> (Option<&str>, Option<f64>, f64, Option<&str>) {
    match outcome {
        DimensionOutcome::Labeled {
            label,
            score,
            confidence,
        } => (Some(label.as_str()), Some(*score), *confidence, None),
        DimensionOutcome::Abstained { reason, confidence } => {
            (None, None, *confidence, Some(reason.as_str()))
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Corpus overview for the `stats` command
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_posts: i64,
    pub status_counts: Vec<(String, i64)>,
    pub difficulty: Vec<(String, i64)>,
    pub course_evaluation: Vec<(String, i64)>,
    pub sentiment: Vec<(String, i64)>,
    pub with_university: i64,
    pub with_major: i64,
    pub with_program: i64,
    pub runs: i64,
}

// ============================================================================
// Repository
// ============================================================================

/// Persistence operations the rest of the system depends on
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a fetched post, refreshing the raw fields if it exists.
    /// Processing columns are left untouched.
    async fn upsert_raw(&self, post: &RawPost) -> Result<()>;

    /// Record the cleaned fields for a post
    async fn save_clean(&self, clean: &CleanPost) -> Result<()>;

    /// Record a terminal outcome: labels, duplicate verdict or skip
    async fn save_outcome(&self, outcome: &PostOutcome) -> Result<()>;

    /// Set the processing status and optional reason for a post
    async fn mark_status(&self, post_id: &str, status: &str, reason: Option<&str>) -> Result<()>;

    /// Record a batch run report
    async fn save_run(&self, report: &RunReport) -> Result<()>;

    /// Posts that have not been through the pipeline yet, oldest first
    async fn fetch_unprocessed(&self, limit: i64) -> Result<Vec<RawPost>>;

    /// Corpus statistics: status counts, label distributions, entity
    /// coverage
    async fn stats(&self) -> Result<StoreStats>;

    /// Write every processed post as one JSON object per line.
    /// Returns the number of exported records.
    async fn export_jsonl(&self, path: &Path) -> Result<usize>;
}

/// PostgreSQL-backed post store
pub struct PostStore {
    pool: PgPool,
}

impl PostStore {
    /// Connect using the configured URL and pool size
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(&config.url)
            .await
            .map_err(|e| AdmitError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create the tables and indexes if they do not exist
    pub async fn setup(&self) -> Result<()> {
        for statement in [CREATE_POSTS, CREATE_RUNS, CREATE_STATUS_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AdmitError::DatabaseError(format!("Schema setup failed: {e}")))?;
        }
        Ok(())
    }

    async fn save_labeled(&self, post: &LabeledPost) -> Result<()> {
        let university = post.entities.university.as_ref();
        let major = post.entities.major.as_ref();
        let program = post.entities.program.as_ref();
        let difficulty = dimension_columns(&post.difficulty);
        let course = dimension_columns(&post.course_evaluation);
        let sentiment = dimension_columns(&post.sentiment);

        sqlx::query(
            r#"
            UPDATE posts SET
                status = $2,
                skip_reason = NULL,
                university = $3, university_confidence = $4,
                major = $5, major_confidence = $6,
                program = $7, program_confidence = $8,
                difficulty_label = $9, difficulty_score = $10,
                difficulty_confidence = $11, difficulty_reason = $12,
                course_label = $13, course_score = $14,
                course_confidence = $15, course_reason = $16,
                sentiment_label = $17, sentiment_score = $18,
                sentiment_confidence = $19, sentiment_reason = $20,
                processed_at = $21
            WHERE post_id = $1
            "#,
        )
        .bind(&post.id)
        .bind(STATUS_PROCESSED)
        .bind(university.map(|e| e.value.as_str()))
        .bind(university.map(|e| e.confidence))
        .bind(major.map(|e| e.value.as_str()))
        .bind(major.map(|e| e.confidence))
        .bind(program.map(|e| e.value.as_str()))
        .bind(program.map(|e| e.confidence))
        .bind(difficulty.0)
        .bind(difficulty.1)
        .bind(difficulty.2)
        .bind(difficulty.3)
        .bind(course.0)
        .bind(course.1)
        .bind(course.2)
        .bind(course.3)
        .bind(sentiment.0)
        .bind(sentiment.1)
        .bind(sentiment.2)
        .bind(sentiment.3)
        .bind(post.processed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AdmitError::DatabaseError(format!("Failed to save labels: {e}")))?;

        Ok(())
    }

    async fn label_distribution(&self, column: &str) -> Result<Vec<(String, i64)>> {
        let sql = format!(
            "SELECT {column}, COUNT(*) FROM posts \
             WHERE {column} IS NOT NULL GROUP BY {column} ORDER BY COUNT(*) DESC"
        );
        sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AdmitError::DatabaseError(format!("Failed to read distribution: {e}")))
    }

    async fn count_where(&self, predicate: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM posts WHERE {predicate}");
        let row: (i64,) = sqlx::query_as(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AdmitError::DatabaseError(format!("Failed to count posts: {e}")))?;
        Ok(row.0)
    }
}

#[async_trait]
impl PostRepository for PostStore {
    async fn upsert_raw(&self, post: &RawPost) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (post_id, subreddit, title, body, comments, score, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (post_id) DO UPDATE SET
                subreddit = EXCLUDED.subreddit,
                title = EXCLUDED.title,
                body = EXCLUDED.body,
                comments = EXCLUDED.comments,
                score = EXCLUDED.score,
                created_utc = EXCLUDED.created_utc
            "#,
        )
        .bind(&post.id)
        .bind(&post.subreddit)
        .bind(&post.title)
        .bind(&post.body)
        .bind(&post.comments)
        .bind(post.score)
        .bind(post.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AdmitError::DatabaseError(format!("Failed to upsert post: {e}")))?;

        Ok(())
    }

    async fn save_clean(&self, clean: &CleanPost) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts SET
                clean_title = $2,
                clean_body = $3,
                language = $4,
                content_hash = $5,
                valid_length = $6
            WHERE post_id = $1
            "#,
        )
        .bind(&clean.id)
        .bind(&clean.title)
        .bind(&clean.body)
        .bind(clean.language.code())
        .bind(&clean.content_hash)
        .bind(clean.valid_length)
        .execute(&self.pool)
        .await
        .map_err(|e| AdmitError::DatabaseError(format!("Failed to save cleaned fields: {e}")))?;

        Ok(())
    }

    async fn save_outcome(&self, outcome: &PostOutcome) -> Result<()> {
        match outcome {
            PostOutcome::Labeled(post) => self.save_labeled(post).await,
            PostOutcome::Duplicate { id, canonical_id } => {
                sqlx::query(
                    r#"
                    UPDATE posts SET
                        status = $2,
                        skip_reason = $3,
                        duplicate_of = $4,
                        processed_at = NOW()
                    WHERE post_id = $1
                    "#,
                )
                .bind(id)
                .bind(STATUS_DUPLICATE)
                .bind("duplicate")
                .bind(canonical_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AdmitError::DatabaseError(format!("Failed to save duplicate verdict: {e}"))
                })?;
                Ok(())
            }
            PostOutcome::Skipped { id, reason } => {
                self.mark_status(id, STATUS_SKIPPED, Some(reason.as_str()))
                    .await
            }
        }
    }

    async fn mark_status(&self, post_id: &str, status: &str, reason: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE posts SET status = $2, skip_reason = $3 WHERE post_id = $1")
            .bind(post_id)
            .bind(status)
            .bind(reason)
            .execute(&self.pool)
            .await
            .map_err(|e| AdmitError::DatabaseError(format!("Failed to mark status: {e}")))?;

        Ok(())
    }

    async fn save_run(&self, report: &RunReport) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO runs (
                run_id, started_at, finished_at,
                input, normalized, language_filtered, invalid_length,
                duplicates, extracted, labeled, abstained
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (run_id) DO NOTHING
            "#,
        )
        .bind(report.run_id)
        .bind(report.started_at)
        .bind(report.finished_at)
        .bind(report.counts.input as i64)
        .bind(report.counts.normalized as i64)
        .bind(report.counts.language_filtered as i64)
        .bind(report.counts.invalid_length as i64)
        .bind(report.counts.duplicates as i64)
        .bind(report.counts.extracted as i64)
        .bind(report.counts.labeled as i64)
        .bind(report.counts.abstained as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| AdmitError::DatabaseError(format!("Failed to save run report: {e}")))?;

        Ok(())
    }

    async fn fetch_unprocessed(&self, limit: i64) -> Result<Vec<RawPost>> {
        let rows: Vec<RawPostRow> = sqlx::query_as(
            r#"
            SELECT post_id, subreddit, title, body, comments, score, created_utc
            FROM posts
            WHERE status = $1
            ORDER BY fetched_at, post_id
            LIMIT $2
            "#,
        )
        .bind(STATUS_UNPROCESSED)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AdmitError::DatabaseError(format!("Failed to fetch unprocessed: {e}")))?;

        Ok(rows.into_iter().map(RawPost::from).collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let status_counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM posts GROUP BY status ORDER BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AdmitError::DatabaseError(format!("Failed to read status counts: {e}"))
                })?;

        let total_posts = status_counts.iter().map(|(_, n)| n).sum();

        let runs_row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM runs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AdmitError::DatabaseError(format!("Failed to count runs: {e}")))?;

        Ok(StoreStats {
            total_posts,
            status_counts,
            difficulty: self.label_distribution("difficulty_label").await?,
            course_evaluation: self.label_distribution("course_label").await?,
            sentiment: self.label_distribution("sentiment_label").await?,
            with_university: self.count_where("university IS NOT NULL").await?,
            with_major: self.count_where("major IS NOT NULL").await?,
            with_program: self.count_where("program IS NOT NULL").await?,
            runs: runs_row.0,
        })
    }

    async fn export_jsonl(&self, path: &Path) -> Result<usize> {
        let sql = format!(
            "SELECT {EXPORT_COLUMNS} FROM posts WHERE status = $1 ORDER BY processed_at, post_id"
        );
        let rows: Vec<ExportRow> = sqlx::query_as(&sql)
            .bind(STATUS_PROCESSED)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AdmitError::DatabaseError(format!("Failed to read export rows: {e}")))?;

        let mut out = String::new();
        for row in &rows {
            let line = serde_json::to_string(row).map_err(|e| {
                AdmitError::DatabaseError(format!("Failed to encode export row: {e}"))
            })?;
            out.push_str(&line);
            out.push('\n');
        }

        tokio::fs::write(path, out)
            .await
            .map_err(|e| AdmitError::DatabaseError(format!("Failed to write export file: {e}")))?;

        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_post_row_conversion() {
        let row = RawPostRow {
            post_id: "t3_abc".to_string(),
            subreddit: "gradadmissions".to_string(),
            title: "Got in".to_string(),
            body: "Accepted to my dream program.".to_string(),
            comments: vec!["Congrats!".to_string()],
            score: 12,
            created_utc: None,
        };

        let post = RawPost::from(row);
        assert_eq!(post.id, "t3_abc");
        assert_eq!(post.subreddit, "gradadmissions");
        assert_eq!(post.comments, ["Congrats!"]);
        assert_eq!(post.score, 12);
    }

    #[test]
    fn test_dimension_columns_for_labeled_outcome() {
        let outcome = DimensionOutcome::Labeled {
            label: "难".to_string(),
            score: 7.2,
            confidence: 0.85,
        };
        let (label, score, confidence, reason) = dimension_columns(&outcome);
        assert_eq!(label, Some("难"));
        assert_eq!(score, Some(7.2));
        assert_eq!(confidence, 0.85);
        assert_eq!(reason, None);
    }

    #[test]
    fn test_dimension_columns_for_abstention() {
        let outcome = DimensionOutcome::Abstained {
            reason: admit_core::AbstainReason::NoCandidates,
            confidence: 0.0,
        };
        let (label, score, confidence, reason) = dimension_columns(&outcome);
        assert_eq!(label, None);
        assert_eq!(score, None);
        assert_eq!(confidence, 0.0);
        assert_eq!(reason, Some("no_candidates"));
    }

    #[test]
    fn test_export_row_keeps_abstained_columns_null() {
        let row = ExportRow {
            post_id: "t3_abc".to_string(),
            subreddit: "gradadmissions".to_string(),
            title: "Got in".to_string(),
            clean_body: Some("Accepted to my dream program.".to_string()),
            language: Some("en".to_string()),
            university: Some("MIT".to_string()),
            university_confidence: Some(0.9),
            major: None,
            major_confidence: None,
            program: None,
            program_confidence: None,
            difficulty_label: None,
            difficulty_score: None,
            difficulty_confidence: Some(0.5),
            difficulty_reason: Some("below_confidence_threshold".to_string()),
            course_label: None,
            course_score: None,
            course_confidence: Some(0.0),
            course_reason: Some("no_candidates".to_string()),
            sentiment_label: Some("积极".to_string()),
            sentiment_score: Some(8.5),
            sentiment_confidence: Some(1.0),
            sentiment_reason: None,
            processed_at: None,
        };

        let line = serde_json::to_string(&row).unwrap();
        assert!(line.contains(r#""university":"MIT""#));
        assert!(line.contains(r#""difficulty_label":null"#));
        assert!(line.contains(r#""difficulty_reason":"below_confidence_threshold""#));
        assert!(line.contains(r#""sentiment_label":"积极""#));
    }
}

//! Remote labeling methods.
//!
//! Two methods that call out over HTTP: [`NeuralClassifier`] sends the
//! text to a transformer sentiment endpoint, [`LlmLabelScorer`] prompts
//! an LLM for all three dimensions at once. Request failures surface as
//! [`AdmitError::MethodUnavailable`] so the labeler can drop the vote
//! and keep going.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use admit_core::{
    AdmitError, Dimension, LabelCandidate, LabelMethod, LabelMethodId, LlmClient, NeuralConfig,
    Result,
};

/// Longest input, in characters, forwarded to the classifier
pub const CLASSIFIER_INPUT_LIMIT: usize = 512;

const LABELING_PROMPT: &str = "分析以下留学相关文本的三个维度，并给出评分：\n\n\
文本: {text}\n\n\
请分析：\n\
1. 申请难度 (极难/难/中等/易) 和评分 (0-10，10最难)\n\
2. 课程评价 (优秀/良好/一般/差) 和评分 (0-10，10最好)\n\
3. 情感倾向 (积极/消极/中性) 和评分 (0-10，10最积极)\n\n\
返回JSON格式:\n\
{\"difficulty_label\": \"难度标签\", \"difficulty_score\": 0, \
\"course_label\": \"课程标签\", \"course_score\": 0, \
\"sentiment_label\": \"情感标签\", \"sentiment_score\": 0}";

// ============================================================================
// Transformer classifier
// ============================================================================

/// HTTP sentiment classifier client; votes only on sentiment
pub struct NeuralClassifier {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    label: String,
    score: f64,
}

impl NeuralClassifier {
    /// Create from config
    pub fn from_config(config: &NeuralConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(AdmitError::ConfigError(
                "classifier endpoint required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdmitError::LabelingError(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

/// Map a classifier label and confidence onto the sentiment scale.
///
/// Confidence stretches the score away from the neutral midpoint, so a
/// certain positive lands near 10 and a hesitant one near 6.
fn remap_classification(label: &str, confidence: f64) -> (&'static str, f64) {
    match label.to_uppercase().as_str() {
        "POSITIVE" | "POS" => ("积极", 6.0 + confidence * 4.0),
        "NEGATIVE" | "NEG" => ("消极", 4.0 - confidence * 4.0),
        _ => ("中性", 5.0),
    }
}

/// Cut a text to at most `limit` characters without splitting one
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[async_trait]
impl LabelMethod for NeuralClassifier {
    fn id(&self) -> LabelMethodId {
        LabelMethodId::Transformers
    }

    fn dimensions(&self) -> &'static [Dimension] {
        &[Dimension::Sentiment]
    }

    async fn score(&self, text: &str) -> Result<Vec<LabelCandidate>> {
        let request = ClassifyRequest {
            text: truncate_chars(text, CLASSIFIER_INPUT_LIMIT),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdmitError::MethodUnavailable(format!("Classifier request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AdmitError::MethodUnavailable(format!(
                "Classifier error: {error_text}"
            )));
        }

        let result: ClassifyResponse = response.json().await.map_err(|e| {
            AdmitError::MethodUnavailable(format!("Failed to parse classifier response: {e}"))
        })?;

        let (label, score) = remap_classification(&result.label, result.score.clamp(0.0, 1.0));
        Ok(vec![LabelCandidate::new(
            LabelMethodId::Transformers,
            Dimension::Sentiment,
            label,
            score,
        )])
    }
}

// ============================================================================
// LLM label scorer
// ============================================================================

/// Score structure expected in the LLM JSON answer
#[derive(Debug, Default, Deserialize)]
struct LlmScores {
    difficulty_label: Option<String>,
    difficulty_score: Option<f64>,
    course_label: Option<String>,
    course_score: Option<f64>,
    sentiment_label: Option<String>,
    sentiment_score: Option<f64>,
}

/// Pull the JSON object out of a chatty response. Models often wrap the
/// answer in code fences or prose.
fn parse_scores(response: &str) -> Option<LlmScores> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// One vote from the LLM answer. A recognized label wins; an unknown
/// label with a usable score falls back to the score's bucket.
fn llm_candidate(
    dimension: Dimension,
    label: Option<&str>,
    score: Option<f64>,
) -> Option<LabelCandidate> {
    let score = score.map(|s| s.clamp(0.0, 10.0));

    if let Some(label) = label {
        if let Some(anchor) = dimension.anchor_score(label) {
            return Some(LabelCandidate::new(
                LabelMethodId::Llm,
                dimension,
                label,
                score.unwrap_or(anchor),
            ));
        }
    }

    let score = score?;
    Some(LabelCandidate::new(
        LabelMethodId::Llm,
        dimension,
        dimension.bucket(score),
        score,
    ))
}

/// LLM-backed labeling method; votes on all three dimensions
pub struct LlmLabelScorer {
    llm: Arc<dyn LlmClient>,
}

impl LlmLabelScorer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Build the labeling prompt
    fn build_prompt(text: &str) -> String {
        LABELING_PROMPT.replace("{text}", text)
    }
}

#[async_trait]
impl LabelMethod for LlmLabelScorer {
    fn id(&self) -> LabelMethodId {
        LabelMethodId::Llm
    }

    fn dimensions(&self) -> &'static [Dimension] {
        &Dimension::ALL
    }

    async fn score(&self, text: &str) -> Result<Vec<LabelCandidate>> {
        let response = self.llm.generate(&Self::build_prompt(text)).await?;

        let Some(scores) = parse_scores(&response) else {
            tracing::warn!("LLM labeling answer was not parseable JSON");
            return Ok(Vec::new());
        };

        let mut candidates = Vec::new();
        candidates.extend(llm_candidate(
            Dimension::Difficulty,
            scores.difficulty_label.as_deref(),
            scores.difficulty_score,
        ));
        candidates.extend(llm_candidate(
            Dimension::CourseEvaluation,
            scores.course_label.as_deref(),
            scores.course_score,
        ));
        candidates.extend(llm_candidate(
            Dimension::Sentiment,
            scores.sentiment_label.as_deref(),
            scores.sentiment_score,
        ));

        Ok(candidates)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Embedding-similarity extraction method.
//!
//! Compares the post text against the canonical entity names from the
//! gazetteer in embedding space. Candidate confidence is the cosine
//! similarity itself, gated by the configured threshold, so a hit is
//! always a strong one.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use admit_core::{
    AdmitError, EntityCandidate, EntityKind, ExtractMethodId, ExtractionConfig, ExtractionMethod,
    Result, SemanticConfig,
};

use crate::gazetteer::Gazetteer;
use crate::llm::http_client;

// ============================================================================
// Embedding client
// ============================================================================

/// Client for an Ollama-compatible embeddings endpoint.
pub struct OllamaEmbedding {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    pub fn from_config(config: &SemanticConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Embed one text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .http
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AdmitError::ExtractionError(format!("embedding request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdmitError::ExtractionError(format!(
                "embedding server returned {status}: {detail}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AdmitError::ExtractionError(format!("embedding response body: {e}")))?;

        Ok(parsed.embedding)
    }

    /// Embed a batch of texts one request at a time. The endpoint has no
    /// batch API.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

// ============================================================================
// Semantic matcher
// ============================================================================

/// One reference entity name with its precomputed embedding
struct Reference {
    kind: EntityKind,
    name: String,
    vector: Vec<f32>,
}

/// Embedding-similarity matcher against the canonical entity names
pub struct SemanticMatcher {
    client: OllamaEmbedding,
    references: Vec<Reference>,
    similarity_threshold: f64,
}

impl SemanticMatcher {
    /// Connect to the embedding server and embed every canonical name
    /// once up front. Fails when the server is unreachable, which makes
    /// the method unavailable for the whole run.
    pub async fn connect(
        config: &SemanticConfig,
        extraction: &ExtractionConfig,
        gazetteer: &Gazetteer,
    ) -> Result<Self> {
        let client = OllamaEmbedding::from_config(config)?;

        let mut references = Vec::new();
        for kind in EntityKind::ALL {
            let names: Vec<String> = gazetteer
                .canonicals(kind)
                .iter()
                .map(|n| n.to_string())
                .collect();
            let vectors = client.embed_batch(&names).await?;
            for (name, vector) in names.into_iter().zip(vectors) {
                references.push(Reference { kind, name, vector });
            }
        }

        Ok(Self {
            client,
            references,
            similarity_threshold: extraction.similarity_threshold,
        })
    }
}

/// Cosine similarity of two vectors; 0 for mismatched or zero-norm input
fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

/// Keep every reference whose similarity clears the threshold
fn match_references(
    text_vector: &[f32],
    references: &[Reference],
    threshold: f64,
) -> Vec<EntityCandidate> {
    references
        .iter()
        .filter_map(|reference| {
            let similarity = cosine(text_vector, &reference.vector);
            if similarity >= threshold {
                Some(EntityCandidate::new(
                    ExtractMethodId::Semantic,
                    reference.kind,
                    reference.name.clone(),
                    reference.name.clone(),
                    similarity,
                ))
            } else {
                None
            }
        })
        .collect()
}

#[async_trait]
impl ExtractionMethod for SemanticMatcher {
    fn id(&self) -> ExtractMethodId {
        ExtractMethodId::Semantic
    }

    async fn candidates(&self, text: &str) -> Result<Vec<EntityCandidate>> {
        let text_vector = self.client.embed(text).await?;
        Ok(match_references(
            &text_vector,
            &self.references,
            self.similarity_threshold,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_parallel_and_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![2.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];

        assert!((cosine(&a, &b) - 1.0).abs() < 1e-9);
        assert!(cosine(&a, &c).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_degenerate_input() {
        assert_eq!(cosine(&[], &[]), 0.0);
        assert_eq!(cosine(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_match_references_gates_by_threshold() {
        let references = vec![
            Reference {
                kind: EntityKind::University,
                name: "Stanford".to_string(),
                vector: vec![1.0, 0.0],
            },
            Reference {
                kind: EntityKind::Major,
                name: "Physics".to_string(),
                vector: vec![0.6, 0.8],
            },
        ];

        let matched = match_references(&[1.0, 0.0], &references, 0.85);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].normalized_value, "Stanford");
        assert_eq!(matched[0].kind, EntityKind::University);
        assert!((matched[0].confidence - 1.0).abs() < 1e-9);

        // cosine([1,0], [0.6,0.8]) = 0.6, below the gate
        let matched = match_references(&[1.0, 0.0], &references, 0.5);
        assert_eq!(matched.len(), 2);
    }
}

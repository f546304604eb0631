//! Multi-method entity extraction
//!
//! Runs a configurable set of extraction methods over cleaned post text:
//! - Gazetteer keyword scanning (lexical)
//! - Contextual patterns (syntactic)
//! - Organization-shape tagging (structural)
//! - Embedding similarity against the gazetteer (semantic)
//! - LLM extraction (generative)
//!
//! Each method emits scored candidates; fusion reduces them to at most
//! one resolved value per entity kind.

use std::sync::Arc;
use std::time::Duration;

use admit_core::{
    AppConfig, CleanPost, EntityCandidate, ExtractMethodId, ExtractionConfig, ExtractionMethod,
    LlmClient, ResolvedEntities,
};

/// Hard cap on one method invocation, above the clients' own request
/// timeouts
const METHOD_TIMEOUT: Duration = Duration::from_secs(60);

pub mod fusion;
pub mod gazetteer;
pub mod llm;
pub mod ner;
pub mod patterns;
pub mod semantic;

pub use fusion::resolve;
pub use gazetteer::{Gazetteer, KeywordMatcher};
pub use llm::{create_llm_client, LlmEntityExtractor, OllamaClient, OpenAiClient};
pub use ner::OrgTagger;
pub use patterns::ContextPatterns;
pub use semantic::{OllamaEmbedding, SemanticMatcher};

// ============================================================================
// Extractor
// ============================================================================

/// Runs the configured extraction methods and fuses their candidates
pub struct EntityExtractor {
    methods: Vec<Box<dyn ExtractionMethod>>,
    config: ExtractionConfig,
}

impl EntityExtractor {
    /// Create an extractor with no methods
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            methods: Vec::new(),
            config,
        }
    }

    /// Add an extraction method
    pub fn with_method(mut self, method: Box<dyn ExtractionMethod>) -> Self {
        self.methods.push(method);
        self
    }

    /// Build the method set named in the configuration.
    ///
    /// A method that cannot start (semantic backend unreachable, LLM
    /// requested without a client) is skipped with a warning; the
    /// remaining methods still run.
    pub async fn from_config(config: &AppConfig, llm: Option<Arc<dyn LlmClient>>) -> Self {
        let gazetteer = Arc::new(Gazetteer::from_config(&config.gazetteer));
        let mut extractor = Self::new(config.smart_extraction.clone());

        for method in &config.smart_extraction.methods {
            match method {
                ExtractMethodId::Keyword => {
                    extractor =
                        extractor.with_method(Box::new(KeywordMatcher::new(Arc::clone(&gazetteer))));
                }
                ExtractMethodId::Pattern => {
                    extractor = extractor
                        .with_method(Box::new(ContextPatterns::new(Arc::clone(&gazetteer))));
                }
                ExtractMethodId::Spacy => {
                    extractor =
                        extractor.with_method(Box::new(OrgTagger::new(Arc::clone(&gazetteer))));
                }
                ExtractMethodId::Semantic => {
                    match SemanticMatcher::connect(
                        &config.semantic,
                        &config.smart_extraction,
                        &gazetteer,
                    )
                    .await
                    {
                        Ok(matcher) => extractor = extractor.with_method(Box::new(matcher)),
                        Err(e) => {
                            tracing::warn!("Semantic extraction unavailable, skipping: {}", e);
                        }
                    }
                }
                ExtractMethodId::Llm => match llm {
                    Some(ref client) => {
                        extractor = extractor.with_method(Box::new(LlmEntityExtractor::new(
                            Arc::clone(client),
                            Arc::clone(&gazetteer),
                        )));
                    }
                    None => {
                        tracing::warn!("LLM extraction requested but no client configured");
                    }
                },
            }
        }

        extractor
    }

    /// Identifiers of the methods that will run
    pub fn method_ids(&self) -> Vec<ExtractMethodId> {
        self.methods.iter().map(|m| m.id()).collect()
    }

    /// Run every method over the post and fuse the candidates.
    ///
    /// A method failure is logged and its votes dropped; extraction
    /// continues with whatever the other methods found.
    pub async fn extract(&self, post: &CleanPost) -> ResolvedEntities {
        if post.is_empty() {
            return ResolvedEntities::default();
        }

        let text = post.analysis_text();
        let mut candidates: Vec<EntityCandidate> = Vec::new();

        for method in &self.methods {
            match tokio::time::timeout(METHOD_TIMEOUT, method.candidates(&text)).await {
                Ok(Ok(found)) => {
                    tracing::debug!("{} produced {} candidates", method.id(), found.len());
                    candidates.extend(found);
                }
                Ok(Err(e)) => {
                    tracing::warn!("{} extraction failed, skipping: {}", method.id(), e);
                }
                Err(_) => {
                    tracing::warn!("{} extraction timed out, skipping", method.id());
                }
            }
        }

        fusion::resolve(&candidates, &self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use admit_core::{AdmitError, Language, Result};
    use async_trait::async_trait;

    fn post(title: &str, body: &str) -> CleanPost {
        CleanPost {
            id: "t3_abc123".to_string(),
            subreddit: "gradadmissions".to_string(),
            title: title.to_string(),
            body: body.to_string(),
            language: Language::En,
            content_hash: String::new(),
            valid_length: true,
        }
    }

    fn extractor() -> EntityExtractor {
        let gazetteer = Arc::new(Gazetteer::builtin());
        EntityExtractor::new(ExtractionConfig::default())
            .with_method(Box::new(KeywordMatcher::new(Arc::clone(&gazetteer))))
            .with_method(Box::new(ContextPatterns::new(gazetteer)))
    }

    struct BrokenMethod;

    #[async_trait]
    impl ExtractionMethod for BrokenMethod {
        fn id(&self) -> ExtractMethodId {
            ExtractMethodId::Semantic
        }

        async fn candidates(&self, _text: &str) -> Result<Vec<EntityCandidate>> {
            Err(AdmitError::MethodUnavailable(
                "embedding backend is down".to_string(),
            ))
        }
    }

    #[tokio::test]
    async fn test_extracts_all_three_kinds() {
        let post = post(
            "Just got accepted into MIT for Computer Science PhD!",
            "Still can't believe it. Also waiting on Stanford.",
        );

        let resolved = extractor().extract(&post).await;

        assert_eq!(resolved.university.unwrap().value, "MIT");
        assert_eq!(resolved.major.unwrap().value, "Computer Science");
        assert_eq!(resolved.program.unwrap().value, "PhD");
    }

    #[tokio::test]
    async fn test_empty_post_resolves_nothing() {
        let resolved = extractor().extract(&post("", "")).await;
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_failing_method_does_not_sink_the_rest() {
        let gazetteer = Arc::new(Gazetteer::builtin());
        let extractor = EntityExtractor::new(ExtractionConfig::default())
            .with_method(Box::new(BrokenMethod))
            .with_method(Box::new(KeywordMatcher::new(gazetteer)));

        let post = post("Admitted to Stanford!", "");
        let resolved = extractor.extract(&post).await;

        assert_eq!(resolved.university.unwrap().value, "Stanford");
    }

    #[tokio::test]
    async fn test_default_config_builds_offline_methods() {
        let config = AppConfig::default();
        let extractor = EntityExtractor::from_config(&config, None).await;

        assert_eq!(
            extractor.method_ids(),
            vec![
                ExtractMethodId::Keyword,
                ExtractMethodId::Pattern,
                ExtractMethodId::Spacy,
            ]
        );
    }
}

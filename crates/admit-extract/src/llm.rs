//! LLM client implementations and the LLM extraction method.
//!
//! Provides OpenAI and Ollama chat clients behind the [`LlmClient`] trait.
//! The extraction method prompts for a strict JSON answer and treats the
//! model as one more vote, never as authoritative.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use admit_core::{
    AdmitError, EntityCandidate, EntityKind, ExtractMethodId, ExtractionMethod, LlmClient,
    LlmConfig, LlmProvider, Result,
};

use crate::gazetteer::Gazetteer;

/// Confidence for LLM-extracted entities
pub const LLM_CONFIDENCE: f64 = 0.6;

const EXTRACTION_PROMPT: &str = "Extract universities, academic majors, and degree programs \
from the following text.\n\
Return the result as JSON with keys: universities, majors, programs.\n\
Only include entities that are explicitly mentioned.";

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AdmitError::ExtractionError(format!("http client: {e}")))
}

// ============================================================================
// OpenAI client
// ============================================================================

/// Client for the OpenAI chat-completions endpoint.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AnswerMessage,
}

#[derive(Deserialize)]
struct AnswerMessage {
    content: String,
}

impl OpenAiClient {
    /// Build a client from the `[llm]` section. Fails when the openai
    /// provider is selected without an API key.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let Some(api_key) = config.openai_api_key.clone() else {
            return Err(AdmitError::ConfigError(
                "openai provider selected but no API key set".to_string(),
            ));
        };
        let base_url = match &config.openai_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => "https://api.openai.com/v1".to_string(),
        };

        Ok(Self {
            http: http_client(config.timeout_secs)?,
            api_key,
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdmitError::MethodUnavailable(format!("openai request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdmitError::MethodUnavailable(format!(
                "openai returned {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdmitError::MethodUnavailable(format!("openai response body: {e}")))?;

        match parsed.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content),
            None => Err(AdmitError::MethodUnavailable(
                "openai answer had no choices".to_string(),
            )),
        }
    }
}

// ============================================================================
// Ollama client
// ============================================================================

/// Client for a local Ollama server, non-streaming generate API.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AdmitError::MethodUnavailable(format!("ollama request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdmitError::MethodUnavailable(format!(
                "ollama returned {status}: {detail}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AdmitError::MethodUnavailable(format!("ollama response body: {e}")))?;

        Ok(parsed.response)
    }
}

/// Instantiate the configured completion backend.
pub fn create_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match config.provider {
        LlmProvider::OpenAI => Ok(Arc::new(OpenAiClient::from_config(config)?)),
        LlmProvider::Ollama => Ok(Arc::new(OllamaClient::from_config(config)?)),
    }
}

// ============================================================================
// LLM extraction method
// ============================================================================

/// Entity structure expected in the LLM JSON answer
#[derive(Debug, Default, Deserialize)]
struct LlmEntities {
    #[serde(default)]
    universities: Vec<String>,
    #[serde(default)]
    majors: Vec<String>,
    #[serde(default)]
    programs: Vec<String>,
}

/// Pull the JSON object out of a chatty response. Models often wrap the
/// answer in code fences or prose.
fn parse_entities(response: &str) -> Option<LlmEntities> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// LLM-backed extraction method
pub struct LlmEntityExtractor {
    llm: Arc<dyn LlmClient>,
    gazetteer: Arc<Gazetteer>,
}

impl LlmEntityExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, gazetteer: Arc<Gazetteer>) -> Self {
        Self { llm, gazetteer }
    }

    /// Build the extraction prompt
    fn build_prompt(text: &str) -> String {
        format!("{EXTRACTION_PROMPT}\n\nText: {text}\n\nJSON:")
    }

    fn collect(
        &self,
        kind: EntityKind,
        names: &[String],
        seen: &mut HashSet<(EntityKind, String)>,
        candidates: &mut Vec<EntityCandidate>,
    ) {
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = self
                .gazetteer
                .canonicalize(kind, name)
                .map(|c| c.to_string())
                .unwrap_or_else(|| name.to_string());
            if seen.insert((kind, value.to_lowercase())) {
                candidates.push(EntityCandidate::new(
                    ExtractMethodId::Llm,
                    kind,
                    name,
                    value,
                    LLM_CONFIDENCE,
                ));
            }
        }
    }
}

#[async_trait]
impl ExtractionMethod for LlmEntityExtractor {
    fn id(&self) -> ExtractMethodId {
        ExtractMethodId::Llm
    }

    async fn candidates(&self, text: &str) -> Result<Vec<EntityCandidate>> {
        let response = self.llm.generate(&Self::build_prompt(text)).await?;

        let Some(entities) = parse_entities(&response) else {
            tracing::warn!("LLM extraction answer was not parseable JSON");
            return Ok(Vec::new());
        };

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        self.collect(
            EntityKind::University,
            &entities.universities,
            &mut seen,
            &mut candidates,
        );
        self.collect(EntityKind::Major, &entities.majors, &mut seen, &mut candidates);
        self.collect(
            EntityKind::Program,
            &entities.programs,
            &mut seen,
            &mut candidates,
        );

        Ok(candidates)
    }
}

// ============================================================================
// Tests
// ============================================================================

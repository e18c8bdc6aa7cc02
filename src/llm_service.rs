use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::LLMConfig;
use crate::errors::GenerationError;
use crate::llm_providers::{
    validate_credential, CompletionClient, CompletionRequest, CredentialSelector, JsonResponseParser,
    OpenAIProvider, RandomCredentialSelector,
};
use crate::models::GenerationParams;
use crate::parser::{ensure_marker, parse_completion, Section};
use crate::prompt::{
    build_additional_question_prompt, build_extraction_prompt, build_generation_prompt,
    build_regenerate_prompt, PromptParams, SYSTEM_MESSAGE,
};
use crate::log_llm_operation;

const EXTRACTION_MAX_TOKENS: u32 = 400;
const SINGLE_QUESTION_MAX_TOKENS: u32 = 400;

/// Topics and special requests pulled out of uploaded source text
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedTopics {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub special_requests: Vec<String>,
}

#[derive(Clone)]
pub struct LLMService {
    client: Arc<dyn CompletionClient>,
    selector: Arc<dyn CredentialSelector>,
    credentials: Vec<String>,
    max_tokens: u32,
    temperature: f32,
    json_parser: JsonResponseParser,
}

impl LLMService {
    /// Service backed by the OpenAI-compatible HTTP provider
    pub fn new(config: &LLMConfig) -> Self {
        let provider = OpenAIProvider::new(config.base_url.clone(), Some(config.model.clone()));
        Self::with_client(config, Arc::new(provider))
    }

    pub fn with_client(config: &LLMConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            selector: Arc::new(RandomCredentialSelector),
            credentials: config.credentials.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            json_parser: JsonResponseParser,
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn CredentialSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Get the provider name for logging and testing
    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    /// Get the model name being used
    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Chooses and format-checks the credential for one operation
    fn select_credential(&self) -> Result<&str, GenerationError> {
        let api_key = self
            .selector
            .select(&self.credentials)
            .ok_or(GenerationError::NoCredentials)?;
        validate_credential(api_key)?;
        Ok(api_key)
    }

    /// Builds the prompt, performs the single completion call and parses the reply.
    ///
    /// `Err` means the caller should substitute the fallback set.
    pub async fn generate_questions(&self, params: &GenerationParams) -> Result<Vec<String>, GenerationError> {
        let api_key = self.select_credential()?;
        let start = Instant::now();

        log_llm_operation!(
            start,
            "generate_questions",
            provider = self.provider_name(),
            model = self.model_name()
        );

        let extracted = match params.source_text.as_deref() {
            Some(source) => self.extract_topics(api_key, source).await,
            None => None,
        };

        let topics = extracted
            .as_ref()
            .filter(|e| !e.topics.is_empty())
            .map(|e| e.topics.join(", "))
            .unwrap_or_else(|| params.title.clone());
        let special_requests = extracted
            .as_ref()
            .filter(|e| !e.special_requests.is_empty())
            .map(|e| e.special_requests.join(", "))
            .or_else(|| params.requirements.clone())
            .unwrap_or_default();

        let prompt = build_generation_prompt(&PromptParams {
            topics: &topics,
            special_requests: &special_requests,
            grade_level: params.grade_level.as_deref(),
            timeline: params.timeline.as_deref(),
            source_text: params.source_text.as_deref(),
        });

        let request = CompletionRequest {
            system_message: SYSTEM_MESSAGE.to_string(),
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let completion = match self.client.complete(api_key, &request).await {
            Ok(text) => text,
            Err(e) => {
                log_llm_operation!(error, "generate_questions", provider = self.provider_name(), error = e);
                return Err(e);
            }
        };

        debug!(response_length = completion.len(), "Raw completion received");

        let parsed = parse_completion(&completion);
        if parsed.used_marker_split {
            log_llm_operation!(
                warn,
                "generate_questions",
                "section headers missing, questions split on marker only"
            );
        }
        for section in Section::ALL {
            let found = parsed.section_count(section);
            if !parsed.used_marker_split && found != section.requested_count() {
                debug!(
                    section = section.header(),
                    requested = section.requested_count(),
                    found,
                    "Section count differs from request"
                );
            }
        }

        if parsed.is_empty() {
            log_llm_operation!(
                error,
                "generate_questions",
                provider = self.provider_name(),
                error = GenerationError::EmptyCompletion
            );
            return Err(GenerationError::EmptyCompletion);
        }

        log_llm_operation!(
            success,
            "generate_questions",
            provider = self.provider_name(),
            duration_ms = start.elapsed().as_millis() as u64,
            question_count = parsed.questions.len()
        );

        Ok(parsed.questions)
    }

    /// Best-effort extraction; any failure reads as "nothing extracted"
    async fn extract_topics(&self, api_key: &str, source_text: &str) -> Option<ExtractedTopics> {
        let request = CompletionRequest {
            system_message: SYSTEM_MESSAGE.to_string(),
            prompt: build_extraction_prompt(source_text),
            max_tokens: EXTRACTION_MAX_TOKENS,
            temperature: 0.0,
        };

        let response = match self.client.complete(api_key, &request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Topic extraction request failed, using title and requirements");
                return None;
            }
        };

        match self.json_parser.parse_json_response::<ExtractedTopics>(&response) {
            Ok(extracted) => {
                info!(
                    topic_count = extracted.topics.len(),
                    special_request_count = extracted.special_requests.len(),
                    "Extracted topics from source text"
                );
                Some(extracted)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    json_content = %JsonResponseParser::extract_json_from_response(&response),
                    "Could not parse topic extraction response"
                );
                None
            }
        }
    }

    pub async fn regenerate_question(
        &self,
        paper_title: &str,
        current_text: &str,
        extra_prompt: Option<&str>,
    ) -> Result<String, GenerationError> {
        let prompt = build_regenerate_prompt(paper_title, current_text, extra_prompt);
        self.single_question(prompt, "regenerate_question").await
    }

    pub async fn generate_additional_question(
        &self,
        paper_title: &str,
        existing_questions: &[String],
    ) -> Result<String, GenerationError> {
        let prompt = build_additional_question_prompt(paper_title, existing_questions);
        self.single_question(prompt, "generate_additional_question").await
    }

    async fn single_question(&self, prompt: String, operation: &str) -> Result<String, GenerationError> {
        let api_key = self.select_credential()?;

        log_llm_operation!(start, operation, provider = self.provider_name(), model = self.model_name());

        let request = CompletionRequest {
            system_message: SYSTEM_MESSAGE.to_string(),
            prompt,
            max_tokens: SINGLE_QUESTION_MAX_TOKENS,
            temperature: self.temperature,
        };

        let response = self.client.complete(api_key, &request).await?;
        if response.trim().is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }

        Ok(ensure_marker(&response))
    }
}

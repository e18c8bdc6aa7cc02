use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::errors::GenerationError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Prefix every usable credential carries
pub const CREDENTIAL_PREFIX: &str = "sk-";

/// Common message structure for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

/// One chat-completion round trip: a system and a user message plus sampling settings
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_message: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Remote text-completion service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one request authenticated with `api_key` and return the message content
    async fn complete(&self, api_key: &str, request: &CompletionRequest) -> Result<String, GenerationError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

/// Picks the credential used for one generation operation
pub trait CredentialSelector: Send + Sync {
    fn select<'a>(&self, credentials: &'a [String]) -> Option<&'a str>;
}

/// Uniform random choice, made fresh on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCredentialSelector;

impl CredentialSelector for RandomCredentialSelector {
    fn select<'a>(&self, credentials: &'a [String]) -> Option<&'a str> {
        credentials.choose(&mut rand::thread_rng()).map(String::as_str)
    }
}

/// Always picks the credential at `index`
#[derive(Debug, Clone, Copy)]
pub struct FixedCredentialSelector(pub usize);

impl CredentialSelector for FixedCredentialSelector {
    fn select<'a>(&self, credentials: &'a [String]) -> Option<&'a str> {
        credentials.get(self.0).map(String::as_str)
    }
}

/// Superficial format check applied before any request is sent
pub fn validate_credential(api_key: &str) -> Result<(), GenerationError> {
    if api_key.starts_with(CREDENTIAL_PREFIX) {
        Ok(())
    } else {
        Err(GenerationError::InvalidCredential)
    }
}

/// OpenAI-compatible chat-completion provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<LLMMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIChoice {
    message: LLMMessage,
}

impl OpenAIProvider {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    fn request_body(&self, request: &CompletionRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                LLMMessage {
                    role: "system".to_string(),
                    content: request.system_message.clone(),
                },
                LLMMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAIProvider {
    async fn complete(&self, api_key: &str, request: &CompletionRequest) -> Result<String, GenerationError> {
        let request_body = self.request_body(request);

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = request.prompt.len(),
            max_tokens = request.max_tokens,
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %body,
                "LLM API request failed"
            );
            return Err(GenerationError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let content = decode_completion(&body)?;
        info!(
            provider = self.provider_name(),
            response_length = content.len(),
            "Successfully received LLM response"
        );

        Ok(content)
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Pulls `choices[0].message.content` out of a chat-completion body
pub fn decode_completion(body: &str) -> Result<String, GenerationError> {
    let response: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Decode(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::Decode("no choices in completion response".to_string()))
}

/// Centralized JSON response parser with robust extraction logic
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    /// Extract JSON from LLM responses that might be wrapped in markdown or other formatting
    pub fn extract_json_from_response(content: &str) -> String {
        if let Some(start) = content.find("```json") {
            if let Some(end) = content[start + 7..].find("```") {
                let json_start = start + 7;
                return content[json_start..json_start + end].trim().to_string();
            }
        }

        if let Some(start) = content.find("```") {
            if let Some(end) = content[start + 3..].find("```") {
                let json_start = start + 3;
                let potential_json = content[json_start..json_start + end].trim();
                if potential_json.starts_with('{') || potential_json.starts_with('[') {
                    return potential_json.to_string();
                }
            }
        }

        if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
            if end > start {
                return content[start..=end].to_string();
            }
        }

        content.trim().to_string()
    }

    /// Parse JSON response into a specific type
    pub fn parse_json_response<T>(&self, content: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let json_content = Self::extract_json_from_response(content);
        serde_json::from_str::<T>(&json_content)
            .map_err(|e| anyhow::anyhow!("Failed to parse JSON response: {}", e))
    }
}

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod fallback;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod paper_service;
pub mod parser;
pub mod prompt;

pub use config::{Config, LLMConfig};
pub use database::Database;
pub use errors::*;
pub use llm_providers::{
    CompletionClient, CompletionRequest, CredentialSelector, FixedCredentialSelector,
    JsonResponseParser, OpenAIProvider, RandomCredentialSelector,
};
pub use llm_service::LLMService;
pub use models::*;
pub use paper_service::PaperService;
pub use parser::{parse_completion, ParsedCompletion, Section, MAX_QUESTIONS};

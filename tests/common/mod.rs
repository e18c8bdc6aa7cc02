#![allow(dead_code)]

use async_trait::async_trait;
use paper_generator::{
    CompletionClient, CompletionRequest, Database, FixedCredentialSelector, GenerationError,
    LLMConfig, LLMService, PaperService,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One request observed by [`ScriptedClient`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub api_key: String,
    pub request: CompletionRequest,
}

/// Completion client that replays queued replies in order
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(self: Arc<Self>, text: &str) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self: Arc<Self>, error: GenerationError) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, api_key: &str, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(RecordedCall {
            api_key: api_key.to_string(),
            request: request.clone(),
        });

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Decode("no scripted reply left".to_string())))
    }

    fn provider_name(&self) -> &'static str {
        "Scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

pub fn llm_config(credentials: &[&str]) -> LLMConfig {
    LLMConfig {
        credentials: credentials.iter().map(|k| k.to_string()).collect(),
        ..LLMConfig::default()
    }
}

pub async fn test_db() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

/// Service over a fresh in-memory database, always using the first credential
pub async fn service_with(client: Arc<ScriptedClient>, credentials: &[&str]) -> (PaperService, Database) {
    let db = test_db().await;
    let llm = LLMService::with_client(&llm_config(credentials), client)
        .with_selector(Arc::new(FixedCredentialSelector(0)));
    (PaperService::new(db.clone(), llm), db)
}

/// Creates users until one with `id` exists
pub async fn seed_users(db: &Database, up_to_id: i64) {
    for n in 1..=up_to_id {
        db.create_user(&format!("student-{}", n)).await.unwrap();
    }
}

pub fn four_section_completion() -> String {
    let mut text = String::from("Time Allowed: 45 min\n\nMultiple Choice\n");
    for i in 1..=10 {
        text.push_str(&format!(
            "Q: {}. Which organelle is described in scenario {}?\nA) Nucleus\nB) Mitochondrion\nC) Ribosome\nD) Lysosome\nAnswer: B\n",
            i, i
        ));
    }
    text.push_str("\nVery Short Answer\n");
    for i in 11..=20 {
        text.push_str(&format!("Q: {}. Name one function of the cell membrane.\n", i));
    }
    text.push_str("\nShort Answer\n");
    for i in 21..=30 {
        text.push_str(&format!("Q: {}. Compare diffusion and osmosis.\n", i));
    }
    text.push_str("\nLong Answer\n");
    for i in 31..=37 {
        text.push_str(&format!("Q: {}. Evaluate the role of mitochondria in disease.\n", i));
    }
    text
}

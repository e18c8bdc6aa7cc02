use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

pub const DEFAULT_PAPER_TITLE: &str = "Untitled Paper";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub question_paper_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A stored paper together with the text of its questions, in creation order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperWithQuestions {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<String>,
}

impl PaperWithQuestions {
    pub fn new(paper: Paper, questions: Vec<Question>) -> Self {
        Self {
            id: paper.id,
            title: paper.title,
            user_id: paper.user_id,
            created_at: paper.created_at,
            questions: questions.into_iter().map(|q| q.text).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
}

/// Structured form of the `content` field of a generation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuredContent {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub grade_level: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub timeline: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub requirements: Option<String>,
    pub file_content: Option<String>,
    pub file_image: Option<String>, // base64 image payload, never decoded here
}

/// Accepts a JSON string, number or boolean and keeps its text form
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) => Ok(Some(text)),
        Some(serde_json::Value::Number(number)) => Ok(Some(number.to_string())),
        Some(serde_json::Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected a string or number, got {}", other))),
    }
}

/// `content` is either free-form requirements or a structured object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PaperContent {
    Structured(StructuredContent),
    Text(String),
}

impl Default for PaperContent {
    fn default() -> Self {
        PaperContent::Text(String::new())
    }
}

impl PaperContent {
    /// True when the caller supplied nothing usable
    pub fn is_empty(&self) -> bool {
        match self {
            PaperContent::Text(text) => text.trim().is_empty(),
            PaperContent::Structured(content) => *content == StructuredContent::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePaperRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub content: PaperContent,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegenerateQuestionRequest {
    pub extra_prompt: Option<String>,
}

/// Caller parameters resolved out of a [`CreatePaperRequest`]
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub title: String,
    pub grade_level: Option<String>,
    pub timeline: Option<String>,
    pub requirements: Option<String>,
    pub source_text: Option<String>,
}

impl GenerationParams {
    pub fn from_request(title: Option<&str>, content: &PaperContent) -> Self {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_PAPER_TITLE)
            .to_string();

        match content {
            PaperContent::Text(text) => Self {
                title,
                grade_level: None,
                timeline: None,
                requirements: non_blank(Some(text)),
                source_text: None,
            },
            PaperContent::Structured(structured) => Self {
                title,
                grade_level: non_blank(structured.grade_level.as_ref()),
                timeline: non_blank(structured.timeline.as_ref()),
                requirements: non_blank(structured.requirements.as_ref()),
                source_text: non_blank(structured.file_content.as_ref()),
            },
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Result of a generation request; `error` is set only on the fallback path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperResult {
    pub id: i64,
    pub title: String,
    pub questions: Vec<String>,
    pub grade_level: Option<String>,
    pub timeline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

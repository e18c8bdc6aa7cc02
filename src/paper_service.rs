use anyhow::Result as AnyResult;
use std::time::Instant;

use crate::database::Database;
use crate::errors::{classify_database_error, ApiError};
use crate::fallback::fallback_questions;
use crate::llm_service::LLMService;
use crate::models::*;
use crate::{log_performance, log_service_error, log_service_start, log_service_success, log_service_warn};

const SERVICE: &str = "paper_service";

#[derive(Clone)]
pub struct PaperService {
    db: Database,
    llm: LLMService,
}

impl PaperService {
    pub fn new(db: Database, llm: LLMService) -> Self {
        Self { db, llm }
    }

    // User operations
    pub async fn create_user(&self, username: Option<&str>) -> Result<User, ApiError> {
        let username = username
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::ValidationError("Username is required.".to_string()))?;

        log_service_start!(SERVICE, "create_user");

        if self.db.get_user_by_username(username).await?.is_some() {
            return Err(ApiError::DuplicateResource(format!(
                "Username '{}' already exists.",
                username
            )));
        }

        let user = self
            .db
            .create_user(username)
            .await
            .map_err(|e| classify_database_error(&e))?;

        log_service_success!(SERVICE, "create_user", "user created", user_id = user.id);
        Ok(user)
    }

    /// Generates, persists and returns a paper.
    ///
    /// Remote failures, empty completions and persistence failures of the parsed
    /// questions all degrade to the fallback set, reported in `error`. Only a
    /// missing or unknown user, or a failure to persist the fallback itself,
    /// surface as errors.
    pub async fn generate_paper(&self, request: CreatePaperRequest) -> Result<PaperResult, ApiError> {
        let user_id = request.user_id.ok_or_else(|| {
            ApiError::ValidationError("user_id is required and cannot be null.".to_string())
        })?;

        log_service_start!(SERVICE, "generate_paper", user_id = user_id);
        let start = Instant::now();

        if self.db.get_user(user_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("User with id '{}' not found", user_id)));
        }

        let params = GenerationParams::from_request(request.title.as_deref(), &request.content);
        if let PaperContent::Structured(StructuredContent { file_image: Some(_), .. }) = &request.content {
            log_service_warn!(
                SERVICE,
                "generate_paper",
                "image text extraction is not available, ignoring file_image"
            );
        }

        let failure = match self.llm.generate_questions(&params).await {
            Ok(questions) => match self.persist(&params.title, user_id, &questions).await {
                Ok(paper) => {
                    log_service_success!(
                        SERVICE,
                        "generate_paper",
                        "paper stored",
                        paper_id = paper.id,
                        question_count = paper.questions.len(),
                        duration_ms = start.elapsed().as_millis() as u64
                    );
                    return Ok(paper_result(paper, &params, None));
                }
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        log_service_warn!(
            SERVICE,
            "generate_paper",
            format!("using fallback question set: {}", failure)
        );

        let questions = fallback_questions(&params.title, params.requirements.as_deref());
        let paper = self.persist(&params.title, user_id, &questions).await.map_err(|e| {
            log_service_error!(SERVICE, "generate_paper", "could not persist fallback paper", error = e);
            ApiError::DatabaseError(e)
        })?;

        log_performance!("generate_paper", duration_ms = start.elapsed().as_millis() as u64);
        Ok(paper_result(paper, &params, Some(failure)))
    }

    /// A failed attempt leaves no paper row behind
    async fn persist(&self, title: &str, user_id: i64, questions: &[String]) -> AnyResult<PaperWithQuestions> {
        let (paper, stored) = self.db.create_paper_with_questions(title, user_id, questions).await?;
        Ok(PaperWithQuestions::new(paper, stored))
    }

    // Retrieval
    pub async fn get_paper(&self, paper_id: i64) -> Result<PaperWithQuestions, ApiError> {
        let paper = self.db.get_paper(paper_id).await?.ok_or_else(|| paper_not_found(paper_id))?;
        let questions = self.db.get_questions_for_paper(paper.id).await?;
        Ok(PaperWithQuestions::new(paper, questions))
    }

    pub async fn get_papers_for_user(&self, user_id: i64) -> Result<Vec<PaperWithQuestions>, ApiError> {
        if self.db.get_user(user_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("User with id '{}' not found", user_id)));
        }

        let papers = self.db.get_papers_for_user(user_id).await?;
        let mut result = Vec::with_capacity(papers.len());
        for paper in papers {
            let questions = self.db.get_questions_for_paper(paper.id).await?;
            result.push(PaperWithQuestions::new(paper, questions));
        }
        Ok(result)
    }

    // Question maintenance
    pub async fn regenerate_question(
        &self,
        paper_id: i64,
        question_id: i64,
        extra_prompt: Option<&str>,
    ) -> Result<Question, ApiError> {
        log_service_start!(SERVICE, "regenerate_question", paper_id = paper_id);

        let paper = self.db.get_paper(paper_id).await?.ok_or_else(|| paper_not_found(paper_id))?;
        let mut question = self
            .db
            .get_question(question_id)
            .await?
            .filter(|q| q.question_paper_id == paper.id)
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "Question with id '{}' not found in paper '{}'",
                    question_id, paper_id
                ))
            })?;

        let text = self
            .llm
            .regenerate_question(&paper.title, &question.text, extra_prompt)
            .await
            .map_err(|e| {
                log_service_error!(SERVICE, "regenerate_question", "completion failed", paper_id = paper_id, error = e);
                ApiError::from(e)
            })?;

        self.db.update_question_text(question.id, &text).await?;
        question.text = text;

        log_service_success!(SERVICE, "regenerate_question", "question rewritten", question_id = question.id);
        Ok(question)
    }

    pub async fn generate_new_question(&self, paper_id: i64) -> Result<Question, ApiError> {
        log_service_start!(SERVICE, "generate_new_question", paper_id = paper_id);

        let paper = self.db.get_paper(paper_id).await?.ok_or_else(|| paper_not_found(paper_id))?;
        let existing: Vec<String> = self
            .db
            .get_questions_for_paper(paper.id)
            .await?
            .into_iter()
            .map(|q| q.text)
            .collect();

        let text = self
            .llm
            .generate_additional_question(&paper.title, &existing)
            .await
            .map_err(|e| {
                log_service_error!(SERVICE, "generate_new_question", "completion failed", paper_id = paper_id, error = e);
                ApiError::from(e)
            })?;

        let question = self.db.create_question(paper.id, &text).await?;
        log_service_success!(SERVICE, "generate_new_question", "question added", question_id = question.id);
        Ok(question)
    }
}

fn paper_not_found(paper_id: i64) -> ApiError {
    ApiError::NotFound(format!("Paper with id '{}' not found", paper_id))
}

fn paper_result(paper: PaperWithQuestions, params: &GenerationParams, error: Option<String>) -> PaperResult {
    PaperResult {
        id: paper.id,
        title: paper.title,
        questions: paper.questions,
        grade_level: params.grade_level.clone(),
        timeline: params.timeline.clone(),
        error,
    }
}

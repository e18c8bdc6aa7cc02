use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;

use crate::{
    errors::{ApiError, ErrorContext},
    models::*,
    paper_service::PaperService,
};

use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    pub paper_service: PaperService,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), (StatusCode, Json<ApiResponse<()>>)>;

fn ok<T>(status: StatusCode, data: T) -> ApiResult<T> {
    Ok((status, Json(ApiResponse::success(data))))
}

// User endpoints
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    log_api_start!("create_user");

    match state.paper_service.create_user(request.username.as_deref()).await {
        Ok(user) => {
            log_api_success!("create_user", "user created", user_id = user.id);
            ok(StatusCode::CREATED, user)
        }
        Err(e) => {
            let context = ErrorContext::new("create_user", "user")
                .with_id(request.username.as_deref().unwrap_or_default());
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn get_user_papers(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<PaperWithQuestions>> {
    log_api_start!("get_user_papers", user_id = user_id);

    match state.paper_service.get_papers_for_user(user_id).await {
        Ok(papers) => {
            log_api_success!("get_user_papers", "papers listed", user_id = user_id, count = papers.len());
            ok(StatusCode::OK, papers)
        }
        Err(e) => {
            let context = ErrorContext::new("get_user_papers", "user").with_id(&user_id.to_string());
            Err(e.to_response_with_context(context))
        }
    }
}

// Paper endpoints
pub async fn create_paper_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(mut request): Json<CreatePaperRequest>,
) -> ApiResult<PaperResult> {
    log_api_start!("create_paper_for_user", user_id = user_id);

    if request.content.is_empty() {
        let error = ApiError::BadRequest("The 'content' field is required.".to_string());
        return Err(error.to_response_with_context(
            ErrorContext::new("create_paper_for_user", "paper").with_id(&user_id.to_string()),
        ));
    }

    request.user_id = Some(user_id);
    generate(state, request, "create_paper_for_user").await
}

pub async fn create_paper(
    State(state): State<AppState>,
    Json(request): Json<CreatePaperRequest>,
) -> ApiResult<PaperResult> {
    log_api_start!("create_paper");
    generate(state, request, "create_paper").await
}

async fn generate(state: AppState, request: CreatePaperRequest, operation: &str) -> ApiResult<PaperResult> {
    match state.paper_service.generate_paper(request).await {
        Ok(result) => {
            if let Some(reason) = &result.error {
                log_api_warn!(operation, format!("fallback paper returned: {}", reason), paper_id = result.id);
            } else {
                log_api_success!(operation, "paper generated", paper_id = result.id);
            }
            ok(StatusCode::CREATED, result)
        }
        Err(e) => {
            log_api_error!(operation, "paper generation failed", error = e);
            Err(e.to_response_with_context(ErrorContext::new(operation, "paper")))
        }
    }
}

pub async fn get_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<i64>,
) -> ApiResult<PaperWithQuestions> {
    log_api_start!("get_paper", paper_id = paper_id);

    match state.paper_service.get_paper(paper_id).await {
        Ok(paper) => {
            log_api_success!("get_paper", "paper retrieved", paper_id = paper_id);
            ok(StatusCode::OK, paper)
        }
        Err(e) => {
            let context = ErrorContext::new("get_paper", "paper").with_id(&paper_id.to_string());
            Err(e.to_response_with_context(context))
        }
    }
}

// Question endpoints
pub async fn regenerate_question(
    State(state): State<AppState>,
    Path((paper_id, question_id)): Path<(i64, i64)>,
    body: Bytes,
) -> ApiResult<Question> {
    log_api_start!("regenerate_question", paper_id = paper_id);

    // An absent body means no extra instructions; a malformed one is rejected
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RegenerateQuestionRequest::default()
    } else {
        serde_json::from_slice::<RegenerateQuestionRequest>(&body).map_err(|e| {
            ApiError::BadRequest(format!("Invalid JSON body: {}", e)).to_response_with_context(
                ErrorContext::new("regenerate_question", "question").with_id(&question_id.to_string()),
            )
        })?
    };
    let extra_prompt = request.extra_prompt;

    match state
        .paper_service
        .regenerate_question(paper_id, question_id, extra_prompt.as_deref())
        .await
    {
        Ok(question) => {
            log_api_success!("regenerate_question", "question regenerated", paper_id = paper_id, question_id = question_id);
            ok(StatusCode::OK, question)
        }
        Err(e) => {
            let context = ErrorContext::new("regenerate_question", "question")
                .with_id(&question_id.to_string());
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn generate_new_question(
    State(state): State<AppState>,
    Path(paper_id): Path<i64>,
) -> ApiResult<Question> {
    log_api_start!("generate_new_question", paper_id = paper_id);

    match state.paper_service.generate_new_question(paper_id).await {
        Ok(question) => {
            log_api_success!("generate_new_question", "question added", paper_id = paper_id, question_id = question.id);
            ok(StatusCode::CREATED, question)
        }
        Err(e) => {
            let context = ErrorContext::new("generate_new_question", "paper")
                .with_id(&paper_id.to_string())
                .with_user_message("Paper not found");
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // User routes
        .route("/api/v1/users", post(create_user))
        .route(
            "/api/v1/users/:user_id/papers",
            post(create_paper_for_user).get(get_user_papers),
        )
        // Paper routes
        .route("/api/v1/papers", post(create_paper))
        .route("/api/v1/papers/:paper_id", get(get_paper))
        // Question routes
        .route(
            "/api/v1/papers/:paper_id/questions/:question_id/regenerate",
            put(regenerate_question),
        )
        .route(
            "/api/v1/papers/:paper_id/questions/generate",
            post(generate_new_question),
        )
        .with_state(state)
}

use crate::api::ApiResponse;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Failure of the remote-call-and-parse step of paper generation.
///
/// Every variant is recoverable: the caller substitutes the fallback set.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("No API credentials configured")]
    NoCredentials,

    #[error("Invalid API key format. Key must start with 'sk-'.")]
    InvalidCredential,

    #[error("Completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion API error: {status} {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Could not decode completion response: {0}")]
    Decode(String),

    #[error("Completion response contained no questions")]
    EmptyCompletion,
}

/// Errors surfaced to HTTP callers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource already exists: {0}")]
    DuplicateResource(String),

    #[error("LLM service error: {0}")]
    LLMError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] anyhow::Error),
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        ApiError::LLMError(err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(anyhow::Error::from(err))
    }
}

/// What the failing handler was doing, for the error log line
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    /// Replaces the body message of a 404
    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateResource(_) => StatusCode::CONFLICT,
            ApiError::LLMError(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response body; server-side details stay in the log
    fn public_message(&self) -> String {
        match self {
            ApiError::LLMError(_) => "AI service temporarily unavailable. Please try again.".to_string(),
            ApiError::DatabaseError(_) => "Database operation failed. Please try again.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_response_with_context(self, context: ErrorContext) -> (StatusCode, Json<ApiResponse<()>>) {
        let status = self.status_code();

        match status {
            StatusCode::NOT_FOUND => info!(
                operation = %context.operation,
                resource_type = %context.resource_type,
                resource_id = ?context.resource_id,
                error = %self,
                "Resource not found"
            ),
            s if s.is_client_error() => warn!(
                operation = %context.operation,
                resource_type = %context.resource_type,
                resource_id = ?context.resource_id,
                error = %self,
                status = s.as_u16(),
                "Rejected request"
            ),
            s => error!(
                operation = %context.operation,
                resource_type = %context.resource_type,
                resource_id = ?context.resource_id,
                error = %self,
                status = s.as_u16(),
                "Request failed"
            ),
        }

        let message = match (&self, context.user_friendly_message) {
            (ApiError::NotFound(_), Some(custom)) => custom,
            _ => self.public_message(),
        };

        (status, Json(ApiResponse::error(message)))
    }
}

/// Maps storage failures onto API errors by inspecting the driver message
pub fn classify_database_error(error: &anyhow::Error) -> ApiError {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("unique constraint") {
        ApiError::DuplicateResource("Resource already exists".to_string())
    } else if error_str.contains("foreign key constraint") {
        ApiError::NotFound("Referenced resource not found".to_string())
    } else if error_str.contains("no rows") {
        ApiError::NotFound("Resource not found".to_string())
    } else if error_str.contains("not null constraint") {
        ApiError::ValidationError("Required field is missing".to_string())
    } else {
        ApiError::DatabaseError(anyhow::anyhow!("{}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn respond(error: ApiError) -> (StatusCode, Option<String>) {
        let (status, Json(body)) = error.to_response_with_context(ErrorContext::new("test", "paper"));
        assert!(!body.success);
        (status, body.error)
    }

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("create_paper", "paper")
            .with_id("123")
            .with_user_message("Custom message");

        assert_eq!(context.operation, "create_paper");
        assert_eq!(context.resource_type, "paper");
        assert_eq!(context.resource_id, Some("123".to_string()));
        assert_eq!(context.user_friendly_message, Some("Custom message".to_string()));
    }

    #[test]
    fn test_error_classification() {
        let duplicate = anyhow::anyhow!("UNIQUE constraint failed: users.username");
        assert!(matches!(classify_database_error(&duplicate), ApiError::DuplicateResource(_)));

        let fk = anyhow::anyhow!("FOREIGN KEY constraint failed");
        assert!(matches!(classify_database_error(&fk), ApiError::NotFound(_)));

        let missing = anyhow::anyhow!("NOT NULL constraint failed: questions.text");
        assert!(matches!(classify_database_error(&missing), ApiError::ValidationError(_)));

        let other = anyhow::anyhow!("disk I/O error");
        assert!(matches!(classify_database_error(&other), ApiError::DatabaseError(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(respond(ApiError::NotFound("x".into())).0, StatusCode::NOT_FOUND);
        assert_eq!(respond(ApiError::ValidationError("x".into())).0, StatusCode::BAD_REQUEST);
        assert_eq!(respond(ApiError::BadRequest("x".into())).0, StatusCode::BAD_REQUEST);
        assert_eq!(respond(ApiError::DuplicateResource("x".into())).0, StatusCode::CONFLICT);
        assert_eq!(
            respond(ApiError::from(GenerationError::EmptyCompletion)).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            respond(ApiError::DatabaseError(anyhow::anyhow!("locked"))).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let (_, message) = respond(ApiError::DatabaseError(anyhow::anyhow!("secret path /var/db")));
        assert_eq!(message.as_deref(), Some("Database operation failed. Please try again."));

        let (_, message) = respond(ApiError::from(GenerationError::RemoteStatus {
            status: 401,
            body: "bad key sk-abc".to_string(),
        }));
        assert!(!message.unwrap().contains("sk-abc"));
    }

    #[test]
    fn test_not_found_user_message() {
        let (status, Json(body)) = ApiError::NotFound("Paper with id '4' not found".into())
            .to_response_with_context(ErrorContext::new("get_paper", "paper").with_user_message("Paper not found"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.as_deref(), Some("Paper not found"));

        let (_, message) = respond(ApiError::ValidationError("user_id is required".into()));
        assert!(message.unwrap().contains("user_id is required"));
    }

    #[test]
    fn test_generation_error_messages() {
        assert_eq!(
            GenerationError::InvalidCredential.to_string(),
            "Invalid API key format. Key must start with 'sk-'."
        );
        let remote = GenerationError::RemoteStatus {
            status: 429,
            body: "slow down".to_string(),
        };
        assert_eq!(remote.to_string(), "Completion API error: 429 slow down");
    }
}

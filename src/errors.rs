use crate::api::ApiResponse;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    DuplicateResource(String),

    #[error("Upstream failure: {0}")]
    UpstreamFailure(#[from] anyhow::Error),
}

/// Error context for structured logging
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

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<ApiResponse<()>>) {
        match &self {
            ApiError::AuthenticationRequired(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    error = %self,
                    "Request without valid session"
                );
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| "Not authenticated".to_string()),
                    )),
                )
            }
            ApiError::ValidationError(message) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Validation error"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(message.clone())),
                )
            }
            ApiError::NotFound(message) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| message.clone()),
                    )),
                )
            }
            ApiError::DuplicateResource(message) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Duplicate resource"
                );
                (
                    StatusCode::CONFLICT,
                    Json(ApiResponse::error(message.clone())),
                )
            }
            // Upstream detail (provider payloads, SQL text) stays in the log;
            // clients get a stable generic message.
            ApiError::UpstreamFailure(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Upstream failure"
                );
                (
                    StatusCode::BAD_GATEWAY,
                    Json(ApiResponse::error(
                        "Upstream service unavailable. Please try again.".to_string(),
                    )),
                )
            }
        }
    }

    /// Simple conversion without context (for handlers with nothing to add)
    pub fn to_response(self) -> (StatusCode, Json<ApiResponse<()>>) {
        let context = ErrorContext::new("unknown", "resource");
        self.to_response_with_context(context)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::UpstreamFailure(anyhow::Error::from(err))
    }
}

/// Helper function to detect error types from anyhow error messages
pub fn classify_storage_error(error: &anyhow::Error) -> ApiError {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("already exists") || error_str.contains("unique constraint") {
        if error_str.contains("username") {
            return ApiError::DuplicateResource("Username already exists".to_string());
        }
        ApiError::DuplicateResource("Resource already exists".to_string())
    } else if error_str.contains("not found") || error_str.contains("no rows") {
        ApiError::NotFound("Resource not found".to_string())
    } else {
        ApiError::UpstreamFailure(anyhow::anyhow!("{}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("save_chat", "chat")
            .with_id("123")
            .with_user_message("Custom message");

        assert_eq!(context.operation, "save_chat");
        assert_eq!(context.resource_type, "chat");
        assert_eq!(context.resource_id, Some("123".to_string()));
        assert_eq!(
            context.user_friendly_message,
            Some("Custom message".to_string())
        );
    }

    #[test]
    fn test_storage_error_classification() {
        let duplicate_error = anyhow::anyhow!("UNIQUE constraint failed: users.username");
        let classified = classify_storage_error(&duplicate_error);
        assert!(matches!(classified, ApiError::DuplicateResource(_)));
        assert!(classified.to_string().contains("Username"));

        let not_found_error = anyhow::anyhow!("No rows returned");
        let classified = classify_storage_error(&not_found_error);
        assert!(matches!(classified, ApiError::NotFound(_)));

        let other_error = anyhow::anyhow!("disk I/O error");
        let classified = classify_storage_error(&other_error);
        assert!(matches!(classified, ApiError::UpstreamFailure(_)));
    }

    #[test]
    fn test_api_error_status_mapping() {
        let error = ApiError::AuthenticationRequired("Not authenticated".to_string());
        let (status, _) = error.to_response();
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let error = ApiError::ValidationError("Topic is required".to_string());
        let (status, _) = error.to_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error = ApiError::NotFound("Chat not found".to_string());
        let context = ErrorContext::new("get_chat", "chat").with_id("123");
        let (status, _) = error.to_response_with_context(context);
        assert_eq!(status, StatusCode::NOT_FOUND);

        let error = ApiError::DuplicateResource("Username already exists".to_string());
        let (status, _) = error.to_response();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_upstream_failure_hides_detail() {
        let error = ApiError::UpstreamFailure(anyhow::anyhow!(
            "LLM API error 500: internal provider stack trace"
        ));
        let (status, response) = error.to_response();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let message = response.0.error.unwrap();
        assert!(!message.contains("stack trace"));
        assert!(message.contains("try again"));
    }
}

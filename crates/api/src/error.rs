use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use titanic_core::error::CoreError;
use titanic_core::passenger::ValidationErrors;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses:
/// `{"error", "code"}`, plus a `details` array for validation failures.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `titanic_core`.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Core(core) = &self;

        let (status, body) = match core {
            CoreError::Validation(errors) => {
                tracing::debug!(fields = ?errors.fields(), "Request rejected by validation");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({
                        "error": "Request validation failed",
                        "code": "VALIDATION_ERROR",
                        "details": errors,
                    }),
                )
            }
            // Internal details stay in the logs.
            CoreError::ModelNotFound { .. } | CoreError::ModelFormat { .. } | CoreError::Prediction(_) => {
                tracing::error!(error = %core, "Internal core error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "An internal error occurred",
                        "code": "INTERNAL_ERROR",
                    }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

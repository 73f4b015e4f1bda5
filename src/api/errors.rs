use crate::error::AppError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// API-specific error wrapper that converts AppError into HTTP responses.
///
/// Caller-caused failures carry their message back to the client. Failures of
/// the store or blob infrastructure are logged and answered with a generic
/// message so internal error text never reaches the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // GET-by-id has always answered a bare 404.
            AppError::NotFound(_) => return StatusCode::NOT_FOUND.into_response(),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::QueryExecution(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Query execution failed: {}", msg),
            ),
            AppError::Mapping(msg) => {
                tracing::error!("Failed to map document: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Document could not be read from the content store".to_string(),
                )
            }
            AppError::Database(msg) => {
                tracing::error!("Content store unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Content store unavailable".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Blob storage unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Content storage unavailable".to_string(),
                )
            }
            AppError::Config(msg) | AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

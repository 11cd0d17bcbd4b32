use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::CompletionError;
use crate::projection::parser::ParseError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every variant is recoverable: the failing action leaves session state as it
/// was and the client may retry. Wage lookup misses never reach this type;
/// they render as "N/A".
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A stage was triggered before the stage it depends on produced output.
    #[error("Stage not ready: {0}")]
    StageNotReady(String),

    #[error("Completion failure: {0}")]
    Completion(#[from] CompletionError),

    #[error("Invalid response: {0}")]
    Parse(#[from] ParseError),
}

impl AppError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::StageNotReady(_) => "STAGE_NOT_READY",
            AppError::Completion(_) => "COMPLETION_FAILURE",
            AppError::Parse(ParseError::MalformedJson(_)) => "MALFORMED_JSON",
            AppError::Parse(ParseError::SchemaMismatch(_)) => "SCHEMA_MISMATCH",
            AppError::Parse(ParseError::NoEmbeddedContent) => "NO_EMBEDDED_CONTENT",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// `Json` body extractor whose rejections (missing content type, empty or
/// malformed body, wrong field types) answer with the `AppError` body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::StageNotReady(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Completion(e) => {
                tracing::error!("Completion error: {e}");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            AppError::Parse(e) => {
                tracing::warn!("Rejected model response: {e}");
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_have_distinct_codes() {
        assert_eq!(
            AppError::from(ParseError::MalformedJson("eof".into())).code(),
            "MALFORMED_JSON"
        );
        assert_eq!(
            AppError::from(ParseError::SchemaMismatch("years".into())).code(),
            "SCHEMA_MISMATCH"
        );
        assert_eq!(
            AppError::from(ParseError::NoEmbeddedContent).code(),
            "NO_EMBEDDED_CONTENT"
        );
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::StageNotReady("x".into()), StatusCode::CONFLICT),
            (
                AppError::Completion(CompletionError::Quota("x".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Parse(ParseError::SchemaMismatch("x".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_malformed_body_becomes_validation_error() {
        use axum::{body::Body, http::Request};

        let request = Request::builder()
            .header("content-type", "application/json")
            .body(Body::from("{\"model\": "))
            .unwrap();
        let rejection = AppJson::<serde_json::Value>::from_request(request, &())
            .await
            .err()
            .unwrap();

        assert_eq!(rejection.code(), "VALIDATION_ERROR");
        assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
    }
}

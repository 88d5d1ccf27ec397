// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 400 Bad Request (missing/malformed request fields)
    Validation(String),

    // 429 Too Many Requests (daily generation quota exhausted)
    RateLimited {
        reset_at: chrono::DateTime<chrono::Utc>,
    },

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error (upstream generation failure or unparseable response)
    Generation(String),

    // 500 Internal Server Error
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::RateLimited { reset_at } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "Daily quiz generation limit reached. Please try again tomorrow.",
                    "resetAt": reset_at,
                }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Generation(msg) => {
                tracing::error!("Generation failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to generate quiz" }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::Internal`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Request bodies are deserialized manually so shape errors surface as 400,
/// not the Json extractor's 422.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Generation("generation request timed out".to_string())
        } else {
            AppError::Generation(err.to_string())
        }
    }
}

use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Stable machine-readable error codes carried in every error body.
pub mod codes {
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INVALID_RANGE: &str = "invalid_range";
    pub const SAME_TEACHER: &str = "same_teacher";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const ALREADY_EXISTS: &str = "already_exists";
    pub const LINKED: &str = "linked";
    pub const OVERLAP: &str = "overlap";
    pub const CAPACITY: &str = "capacity";
    pub const ROOM_TAKEN: &str = "room_taken";
    pub const ALREADY_COMPLETED: &str = "already_completed";
    pub const PROGRESS_LOCKED: &str = "progress_locked";
    pub const NO_CHANGES: &str = "no_changes";
    pub const DATABASE: &str = "database";
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Conflict {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, codes::NOT_FOUND, "Not Found".to_string()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                "Missing or invalid credentials".to_string(),
            ),
            AppError::Validation { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, codes::INVALID_INPUT, msg),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::DATABASE,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Serialization(e) => {
                error!("stored data could not be decoded: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::DATABASE,
                    "Stored data could not be decoded".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            code: code.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}

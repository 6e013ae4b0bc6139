//! Error handling module for the sozluk backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DUPLICATE_SLUG: &str = "DUPLICATE_SLUG";
    pub const DUPLICATE_USERNAME: &str = "DUPLICATE_USERNAME";
    pub const DUPLICATE_EMAIL: &str = "DUPLICATE_EMAIL";
    pub const ALREADY_LIKED: &str = "ALREADY_LIKED";
    pub const NOT_LIKED: &str = "NOT_LIKED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Authentication required or credentials invalid
    Unauthorized(String),
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// A topic with the same slug already exists
    DuplicateSlug(String),
    /// Username already taken
    DuplicateUsername(String),
    /// Email already registered
    DuplicateEmail(String),
    /// The user already likes this entry
    AlreadyLiked(String),
    /// The user does not like this entry
    NotLiked(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateSlug(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateUsername(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyLiked(_) => StatusCode::BAD_REQUEST,
            AppError::NotLiked(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::DuplicateSlug(_) => codes::DUPLICATE_SLUG,
            AppError::DuplicateUsername(_) => codes::DUPLICATE_USERNAME,
            AppError::DuplicateEmail(_) => codes::DUPLICATE_EMAIL,
            AppError::AlreadyLiked(_) => codes::ALREADY_LIKED,
            AppError::NotLiked(_) => codes::NOT_LIKED,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::DuplicateSlug(msg)
            | AppError::DuplicateUsername(msg)
            | AppError::DuplicateEmail(msg)
            | AppError::AlreadyLiked(msg)
            | AppError::NotLiked(msg)
            | AppError::Database(msg)
            | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // Log the detail server-side; the client only gets a generic message.
        tracing::error!("Database error: {:?}", err);
        AppError::Database("A database error occurred".to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal("An internal error occurred".to_string())
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}

//! Session-based authentication module.
//!
//! Credentials are verified against bcrypt hashes; successful logins get an
//! opaque bearer token backed by a server-side session row.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::AppState;

/// Session lifetime in days.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Bcrypt work factor for password hashing.
const BCRYPT_COST: u32 = 10;

/// The authenticated identity carried by a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub is_admin: bool,
    pub is_moderator: bool,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            AppError::Unauthorized("You must be logged in for this operation".to_string())
        })?;

        state
            .repo
            .get_session_user(&token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))
    }
}

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Hash a password on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            AppError::Internal("Password hashing failed".to_string())
        })
}

/// Verify a password against a stored hash on the blocking pool.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!("Password verification failed: {}", e);
            AppError::Internal("Password verification failed".to_string())
        })
}

//! Session API endpoints: credential exchange and logout.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use super::ApiResult;
use crate::auth::{self, bearer_token, CurrentUser, SESSION_TTL_DAYS};
use crate::errors::AppError;
use crate::models::{LoginRequest, LoginResponse};
use crate::AppState;

/// POST /api/auth/login - Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    // Same error for unknown user and wrong password; no account probing.
    let Some(user) = state.repo.find_user_by_username(username).await? else {
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    };

    let matches =
        auth::verify_password(request.password.clone(), user.password_hash.clone()).await?;
    if !matches {
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let token = state.repo.create_session(&user.id, SESSION_TTL_DAYS).await?;

    Ok(Json(LoginResponse {
        token,
        user: CurrentUser {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            is_admin: user.is_admin,
            is_moderator: user.is_moderator,
        },
    }))
}

/// POST /api/auth/logout - Invalidate the current session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    state.repo.delete_session(&token).await?;

    Ok(StatusCode::OK)
}

//! User registration API endpoint.

use axum::{extract::State, http::StatusCode, Json};

use super::ApiResult;
use crate::auth;
use crate::errors::AppError;
use crate::models::{
    RegisterRequest, User, DISPLAY_NAME_MAX_LEN, PASSWORD_MIN_LEN, USERNAME_MAX_LEN,
    USERNAME_MIN_LEN,
};
use crate::AppState;

/// POST /api/users/register - Register a new user.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let username = request.username.trim();
    let email = request.email.trim();
    let display_name = request.display_name.trim();

    if username.is_empty() || email.is_empty() || request.password.is_empty() || display_name.is_empty()
    {
        return Err(AppError::Validation("All fields are required".to_string()));
    }

    let username_len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
        return Err(AppError::Validation(format!(
            "Username must be between {} and {} characters long",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    if !valid_username(username) {
        return Err(AppError::Validation(
            "Username may only contain letters, digits and underscores".to_string(),
        ));
    }
    if !valid_email(email) {
        return Err(AppError::Validation(
            "Please provide a valid email address".to_string(),
        ));
    }
    if request.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LEN
        )));
    }
    if display_name.chars().count() > DISPLAY_NAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Display name cannot be more than {} characters long",
            DISPLAY_NAME_MAX_LEN
        )));
    }

    if state.repo.username_exists(username).await? {
        return Err(AppError::DuplicateUsername(
            "This username is already taken".to_string(),
        ));
    }
    if state.repo.email_exists(email).await? {
        return Err(AppError::DuplicateEmail(
            "This email address is already in use".to_string(),
        ));
    }

    let password_hash = auth::hash_password(request.password.clone()).await?;
    let user = state
        .repo
        .create_user(username, email, display_name, &password_hash)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Username shape: ASCII letters, digits and underscores only.
fn valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Minimal email shape check: one @, non-empty local part, domain with a dot,
/// no whitespace. Deliverability is not our problem.
fn valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !domain.contains('@')
}

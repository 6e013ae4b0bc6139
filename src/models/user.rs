//! User model and auth request/response types.

use serde::{Deserialize, Serialize};

/// Username length bounds.
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
/// Minimum password length accepted at registration.
pub const PASSWORD_MIN_LEN: usize = 6;
/// Maximum display name length.
pub const DISPLAY_NAME_MAX_LEN: usize = 50;
/// Maximum bio length.
pub const BIO_MAX_LEN: usize = 500;

/// A registered user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Compact author reference embedded in topics, entries and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

/// Request body for registering a new user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

/// Request body for logging in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Response body for a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: crate::auth::CurrentUser,
}

//! Comment model matching the frontend Comment interface.

use serde::{Deserialize, Serialize};

use super::AuthorRef;

/// Maximum comment length.
pub const COMMENT_MAX_LEN: usize = 1000;

/// A comment on an entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author: AuthorRef,
    pub entry_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a new comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub entry_id: String,
}

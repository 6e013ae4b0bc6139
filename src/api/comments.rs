//! Comment API endpoints.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{client_id, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Comment, CreateCommentRequest, PageParams, Pagination, COMMENT_MAX_LEN};
use crate::relay::EventKind;
use crate::AppState;

/// Query parameters for listing the comments of an entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListQuery {
    #[serde(default)]
    entry_id: Option<String>,
    #[serde(default)]
    limit: Option<String>,
    #[serde(default)]
    page: Option<String>,
}

/// Response body for comment listings.
#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<Comment>,
    pub pagination: Pagination,
}

/// GET /api/comments?entryId= - List the comments of an entry, newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentListQuery>,
) -> ApiResult<Json<CommentListResponse>> {
    let entry_id = query.entry_id.as_deref().unwrap_or("").trim().to_string();
    if entry_id.is_empty() {
        return Err(AppError::Validation("Entry id is required".to_string()));
    }
    if !state.repo.entry_exists(&entry_id).await? {
        return Err(AppError::NotFound(format!("Entry {} not found", entry_id)));
    }

    let page = PageParams::from_raw(query.page.as_deref(), query.limit.as_deref());
    let (comments, total) = state.repo.list_comments(&entry_id, page).await?;

    Ok(Json(CommentListResponse {
        comments,
        pagination: Pagination::new(total, page),
    }))
}

/// POST /api/comments - Create a new comment on an entry.
pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    if request.entry_id.trim().is_empty() {
        return Err(AppError::Validation("Entry id is required".to_string()));
    }

    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Comment content is required".to_string()));
    }
    if content.chars().count() > COMMENT_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Comment cannot be more than {} characters long",
            COMMENT_MAX_LEN
        )));
    }

    let entry_id = request.entry_id.trim();
    if !state.repo.entry_exists(entry_id).await? {
        return Err(AppError::NotFound(format!("Entry {} not found", entry_id)));
    }

    let comment = state.repo.create_comment(content, &user, entry_id).await?;

    state
        .relay
        .publish(EventKind::NewComment, &comment, client_id(&headers));

    Ok((StatusCode::CREATED, Json(comment)))
}

//! Like API endpoints: the like/unlike state machine over an entry's liker
//! set. State is checked before the storage write so misuse gets a precise
//! error instead of a silent no-op.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use super::{client_id, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Entry, LikeRequest};
use crate::relay::EventKind;
use crate::AppState;

/// Query parameters for removing a like.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlikeQuery {
    #[serde(default)]
    entry_id: Option<String>,
}

/// POST /api/likes - Add the current user to an entry's liker set.
pub async fn like_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Json(request): Json<LikeRequest>,
) -> ApiResult<Json<Entry>> {
    let entry_id = request.entry_id.trim();
    if entry_id.is_empty() {
        return Err(AppError::Validation("Entry id is required".to_string()));
    }
    if !state.repo.entry_exists(entry_id).await? {
        return Err(AppError::NotFound(format!("Entry {} not found", entry_id)));
    }
    if state.repo.is_liked(entry_id, &user.id).await? {
        return Err(AppError::AlreadyLiked(
            "You already like this entry".to_string(),
        ));
    }

    state.repo.add_like(entry_id, &user.id).await?;

    let entry = state
        .repo
        .get_entry(entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entry {} not found", entry_id)))?;

    state
        .relay
        .publish(EventKind::NewLike, &entry, client_id(&headers));

    Ok(Json(entry))
}

/// DELETE /api/likes?entryId= - Remove the current user from an entry's
/// liker set.
pub async fn unlike_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Query(query): Query<UnlikeQuery>,
) -> ApiResult<Json<Entry>> {
    let entry_id = query.entry_id.as_deref().unwrap_or("").trim().to_string();
    if entry_id.is_empty() {
        return Err(AppError::Validation("Entry id is required".to_string()));
    }
    if !state.repo.entry_exists(&entry_id).await? {
        return Err(AppError::NotFound(format!("Entry {} not found", entry_id)));
    }
    if !state.repo.is_liked(&entry_id, &user.id).await? {
        return Err(AppError::NotLiked(
            "You do not like this entry".to_string(),
        ));
    }

    state.repo.remove_like(&entry_id, &user.id).await?;

    let entry = state
        .repo
        .get_entry(&entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entry {} not found", entry_id)))?;

    state
        .relay
        .publish(EventKind::EntryUpdated, &entry, client_id(&headers));

    Ok(Json(entry))
}

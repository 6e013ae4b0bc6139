//! Entry API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{client_id, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    CreateEntryRequest, Entry, EntryFilter, PageParams, Pagination, CONTENT_MAX_LEN,
    CONTENT_MIN_LEN,
};
use crate::relay::EventKind;
use crate::AppState;

/// Query parameters for listing entries. `debe=true` selects yesterday's
/// most-liked view; `topic` restricts to a topic id.
#[derive(Debug, Deserialize)]
pub struct EntryListQuery {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    debe: Option<String>,
    #[serde(default)]
    limit: Option<String>,
    #[serde(default)]
    page: Option<String>,
}

/// Response body for entry listings.
#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    pub entries: Vec<Entry>,
    pub pagination: Pagination,
}

/// GET /api/entries - List entries, optionally per topic or the DEBE view.
pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntryListQuery>,
) -> ApiResult<Json<EntryListResponse>> {
    let page = PageParams::from_raw(query.page.as_deref(), query.limit.as_deref());
    let filter = EntryFilter {
        topic_id: query.topic.filter(|t| !t.trim().is_empty()),
        debe: query.debe.as_deref() == Some("true"),
    };

    let (entries, total) = state.repo.list_entries(&filter, page).await?;

    Ok(Json(EntryListResponse {
        entries,
        pagination: Pagination::new(total, page),
    }))
}

/// GET /api/entries/{id} - Get a single entry.
pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entry>> {
    match state.repo.get_entry(&id).await? {
        Some(entry) => Ok(Json(entry)),
        None => Err(AppError::NotFound(format!("Entry {} not found", id))),
    }
}

/// POST /api/entries - Create a new entry under an existing topic.
pub async fn create_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Json(request): Json<CreateEntryRequest>,
) -> ApiResult<(StatusCode, Json<Entry>)> {
    if request.topic_id.trim().is_empty() {
        return Err(AppError::Validation("Topic id is required".to_string()));
    }

    let content = request.content.trim();
    let content_len = content.chars().count();
    if content_len < CONTENT_MIN_LEN {
        return Err(AppError::Validation(format!(
            "Entry must be at least {} characters long",
            CONTENT_MIN_LEN
        )));
    }
    if content_len > CONTENT_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Entry cannot be more than {} characters long",
            CONTENT_MAX_LEN
        )));
    }

    let topic = state
        .repo
        .get_topic(&request.topic_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", request.topic_id)))?;

    let entry = state.repo.create_entry(content, &user, &topic).await?;

    state
        .relay
        .publish(EventKind::NewEntry, &entry, client_id(&headers));

    Ok((StatusCode::CREATED, Json(entry)))
}

//! Topic API endpoints.

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
    CreateTopicRequest, Entry, PageParams, Pagination, Topic, TopicView, CONTENT_MAX_LEN,
    CONTENT_MIN_LEN, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN, TITLE_MIN_LEN,
};
use crate::relay::EventKind;
use crate::slug::slugify;
use crate::AppState;

/// Query parameters for listing topics. Paging values come in as raw strings
/// so malformed input falls back to defaults instead of rejecting the
/// request.
#[derive(Debug, Deserialize)]
pub struct TopicListQuery {
    #[serde(default)]
    popular: Option<String>,
    #[serde(default)]
    today: Option<String>,
    #[serde(default)]
    limit: Option<String>,
    #[serde(default)]
    page: Option<String>,
}

/// Response body for topic listings.
#[derive(Debug, Serialize)]
pub struct TopicListResponse {
    pub topics: Vec<Topic>,
    pub pagination: Pagination,
}

/// Response body for topic creation: the topic and its first entry.
#[derive(Debug, Serialize)]
pub struct CreateTopicResponse {
    pub topic: Topic,
    pub entry: Entry,
}

/// GET /api/topics - List topics; `popular=true` or `today=true` select the
/// ranked views.
pub async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<TopicListQuery>,
) -> ApiResult<Json<TopicListResponse>> {
    let page = PageParams::from_raw(query.page.as_deref(), query.limit.as_deref());
    let view = if query.popular.as_deref() == Some("true") {
        TopicView::Popular
    } else if query.today.as_deref() == Some("true") {
        TopicView::Today
    } else {
        TopicView::Latest
    };

    let (topics, total) = state.repo.list_topics(view, page).await?;

    Ok(Json(TopicListResponse {
        topics,
        pagination: Pagination::new(total, page),
    }))
}

/// GET /api/topics/{slug} - Get a single topic by slug.
pub async fn get_topic(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Topic>> {
    match state.repo.find_topic_by_slug(&slug).await? {
        Some(topic) => Ok(Json(topic)),
        None => Err(AppError::NotFound(format!("Topic '{}' not found", slug))),
    }
}

/// POST /api/topics - Create a topic together with its mandatory first entry.
pub async fn create_topic(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Json(request): Json<CreateTopicRequest>,
) -> ApiResult<(StatusCode, Json<CreateTopicResponse>)> {
    let title = request.title.trim();
    let title_len = title.chars().count();
    if title_len < TITLE_MIN_LEN {
        return Err(AppError::Validation(format!(
            "Title must be at least {} characters long",
            TITLE_MIN_LEN
        )));
    }
    if title_len > TITLE_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Title cannot be more than {} characters long",
            TITLE_MAX_LEN
        )));
    }
    if let Some(description) = &request.description {
        if description.trim().chars().count() > DESCRIPTION_MAX_LEN {
            return Err(AppError::Validation(format!(
                "Description cannot be more than {} characters long",
                DESCRIPTION_MAX_LEN
            )));
        }
    }

    let content_len = request.first_entry.trim().chars().count();
    if content_len < CONTENT_MIN_LEN {
        return Err(AppError::Validation(format!(
            "First entry must be at least {} characters long",
            CONTENT_MIN_LEN
        )));
    }
    if content_len > CONTENT_MAX_LEN {
        return Err(AppError::Validation(format!(
            "First entry cannot be more than {} characters long",
            CONTENT_MAX_LEN
        )));
    }

    let slug = slugify(title);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "Title must contain at least one alphanumeric character".to_string(),
        ));
    }

    let (topic, entry) = state
        .repo
        .create_topic_with_first_entry(&request, &slug, &user)
        .await?;

    let origin = client_id(&headers);
    state
        .relay
        .publish(EventKind::TopicUpdated, &topic, origin.clone());
    state.relay.publish(EventKind::NewEntry, &entry, origin);

    Ok((StatusCode::CREATED, Json(CreateTopicResponse { topic, entry })))
}

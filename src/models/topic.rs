//! Topic model matching the frontend Topic interface.

use serde::{Deserialize, Serialize};

use super::AuthorRef;

/// Title length bounds.
pub const TITLE_MIN_LEN: usize = 3;
pub const TITLE_MAX_LEN: usize = 100;
/// Maximum description length.
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// A discussion topic holding one or more entries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub author: AuthorRef,
    pub entry_count: i64,
    pub is_popular: bool,
    pub is_featured: bool,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Compact topic reference embedded in populated entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRef {
    pub id: String,
    pub title: String,
    pub slug: String,
}

/// Request body for creating a new topic together with its first entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopicRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub first_entry: String,
}

/// How a topic listing is filtered and ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicView {
    /// Newest topics first (default).
    Latest,
    /// Topics flagged popular, most entries first.
    Popular,
    /// Topics created since local midnight, newest first.
    Today,
}

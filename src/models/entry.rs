//! Entry model matching the frontend Entry interface.

use serde::{Deserialize, Serialize};

use super::{AuthorRef, TopicRef};

/// Content length bounds for an entry.
pub const CONTENT_MIN_LEN: usize = 10;
pub const CONTENT_MAX_LEN: usize = 5000;

/// A single post under a topic, populated with its author, topic and liker set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub content: String,
    pub author: AuthorRef,
    pub topic: TopicRef,
    /// User ids that like this entry. Set semantics, no duplicates.
    pub likes: Vec<String>,
    pub is_edited: bool,
    pub is_featured: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a new entry under an existing topic.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub topic_id: String,
}

/// Request body for liking an entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    #[serde(default)]
    pub entry_id: String,
}

/// How an entry listing is filtered and ranked.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Restrict to entries under this topic id.
    pub topic_id: Option<String>,
    /// DEBE: yesterday's entries ranked by like count.
    pub debe: bool,
}

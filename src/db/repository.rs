//! Database repository for CRUD operations.
//!
//! The repository is the content aggregation core: it builds the ranked view
//! queries, maintains the entry-count invariant and owns the atomic like-set
//! operations. Uses prepared statements and transactions for data integrity.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    AuthorRef, Comment, CreateTopicRequest, Entry, EntryFilter, PageParams, Topic, TopicRef,
    TopicView, User,
};

const TOPIC_SELECT: &str = r#"SELECT t.id, t.title, t.slug, t.description, t.author_id,
       t.entry_count, t.is_popular, t.is_featured, t.tags, t.created_at, t.updated_at,
       u.username AS author_username, u.display_name AS author_display_name
FROM topics t
JOIN users u ON u.id = t.author_id"#;

const ENTRY_SELECT: &str = r#"SELECT e.id, e.content, e.author_id, e.topic_id, e.is_edited,
       e.is_featured, e.created_at, e.updated_at,
       u.username AS author_username, u.display_name AS author_display_name,
       t.title AS topic_title, t.slug AS topic_slug
FROM entries e
JOIN users u ON u.id = e.author_id
JOIN topics t ON t.id = e.topic_id"#;

const COMMENT_SELECT: &str = r#"SELECT c.id, c.content, c.author_id, c.entry_id,
       c.created_at, c.updated_at,
       u.username AS author_username, u.display_name AS author_display_name
FROM comments c
JOIN users u ON u.id = c.author_id"#;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Check whether a username is already taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Check whether an email address is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Look up a user by username, including the password hash (for login).
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, display_name, bio, avatar, is_admin, is_moderator, created_at, updated_at FROM users WHERE username = ?"
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Create a new user with an already-hashed password.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, display_name, bio, avatar, is_admin, is_moderator, created_at, updated_at) VALUES (?, ?, ?, ?, ?, NULL, NULL, 0, 0, ?, ?)"
        )
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            display_name: display_name.to_string(),
            bio: None,
            avatar: None,
            is_admin: false,
            is_moderator: false,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    // ==================== SESSION OPERATIONS ====================

    /// Create a session for a user and return its opaque token.
    pub async fn create_session(&self, user_id: &str, ttl_days: i64) -> Result<String, AppError> {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind((now + Duration::days(ttl_days)).to_rfc3339())
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(token)
    }

    /// Resolve a session token to its user, if the session is still valid.
    pub async fn get_session_user(&self, token: &str) -> Result<Option<CurrentUser>, AppError> {
        let row = sqlx::query(
            "SELECT u.id, u.username, u.display_name, u.is_admin, u.is_moderator FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = ? AND s.expires_at > ?"
        )
        .bind(token)
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let is_admin: i32 = row.get("is_admin");
            let is_moderator: i32 = row.get("is_moderator");
            CurrentUser {
                id: row.get("id"),
                username: row.get("username"),
                display_name: row.get("display_name"),
                is_admin: is_admin != 0,
                is_moderator: is_moderator != 0,
            }
        }))
    }

    /// Delete a session. Idempotent; deleting an unknown token is a no-op.
    pub async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove expired sessions, returning how many were purged.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ==================== TOPIC OPERATIONS ====================

    /// Get a topic by ID.
    pub async fn get_topic(&self, id: &str) -> Result<Option<Topic>, AppError> {
        let sql = format!("{TOPIC_SELECT} WHERE t.id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(topic_from_row))
    }

    /// Get a topic by slug.
    pub async fn find_topic_by_slug(&self, slug: &str) -> Result<Option<Topic>, AppError> {
        let sql = format!("{TOPIC_SELECT} WHERE t.slug = ?");
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(topic_from_row))
    }

    /// List topics for one of the ranked views, with the total for pagination.
    pub async fn list_topics(
        &self,
        view: TopicView,
        page: PageParams,
    ) -> Result<(Vec<Topic>, i64), AppError> {
        let (where_clause, order_clause) = match view {
            TopicView::Latest => ("", "ORDER BY t.created_at DESC"),
            TopicView::Popular => (
                "WHERE t.is_popular = 1",
                "ORDER BY t.entry_count DESC, t.id ASC",
            ),
            TopicView::Today => ("WHERE t.created_at >= ?", "ORDER BY t.created_at DESC"),
        };
        let today = today_start().to_rfc3339();

        let sql = format!("{TOPIC_SELECT} {where_clause} {order_clause} LIMIT ? OFFSET ?");
        let mut query = sqlx::query(&sql);
        if view == TopicView::Today {
            query = query.bind(&today);
        }
        let rows = query
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) AS total FROM topics t {where_clause}");
        let mut count_query = sqlx::query(&count_sql);
        if view == TopicView::Today {
            count_query = count_query.bind(&today);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("total");

        Ok((rows.iter().map(topic_from_row).collect(), total))
    }

    /// Create a topic together with its mandatory first entry.
    ///
    /// Both inserts run in one transaction: a failed first-entry write leaves
    /// no visible topic. The topic starts with `entry_count = 1` so the first
    /// entry is never counted through the increment path.
    pub async fn create_topic_with_first_entry(
        &self,
        request: &CreateTopicRequest,
        slug: &str,
        author: &CurrentUser,
    ) -> Result<(Topic, Entry), AppError> {
        let topic_id = uuid::Uuid::new_v4().to_string();
        let entry_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let title = request.title.trim();
        let content = request.first_entry.trim();
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let tags: Vec<String> = request
            .tags
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let tags_json = serde_json::to_string(&tags)?;

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT 1 FROM topics WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateSlug(format!(
                "A topic with slug '{}' already exists",
                slug
            )));
        }

        sqlx::query(
            "INSERT INTO topics (id, title, slug, description, author_id, entry_count, is_popular, is_featured, tags, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 1, 0, 0, ?, ?, ?)"
        )
        .bind(&topic_id)
        .bind(title)
        .bind(slug)
        .bind(&description)
        .bind(&author.id)
        .bind(&tags_json)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO entries (id, content, author_id, topic_id, is_edited, is_featured, created_at, updated_at) VALUES (?, ?, ?, ?, 0, 0, ?, ?)"
        )
        .bind(&entry_id)
        .bind(content)
        .bind(&author.id)
        .bind(&topic_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let author_ref = AuthorRef {
            id: author.id.clone(),
            username: author.username.clone(),
            display_name: author.display_name.clone(),
        };
        let topic = Topic {
            id: topic_id.clone(),
            title: title.to_string(),
            slug: slug.to_string(),
            description,
            author: author_ref.clone(),
            entry_count: 1,
            is_popular: false,
            is_featured: false,
            tags,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let entry = Entry {
            id: entry_id,
            content: content.to_string(),
            author: author_ref,
            topic: TopicRef {
                id: topic_id,
                title: topic.title.clone(),
                slug: topic.slug.clone(),
            },
            likes: Vec::new(),
            is_edited: false,
            is_featured: false,
            created_at: now.clone(),
            updated_at: now,
        };

        Ok((topic, entry))
    }

    /// Bump a topic's entry count by one.
    ///
    /// Issued as a single store-level increment so concurrent entry creations
    /// serialize without lost updates. Never read-modify-write.
    pub async fn increment_entry_count(&self, topic_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE topics SET entry_count = entry_count + 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(topic_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== ENTRY OPERATIONS ====================

    /// Check whether an entry exists.
    pub async fn entry_exists(&self, id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Get an entry by ID, populated with author, topic and liker set.
    pub async fn get_entry(&self, id: &str) -> Result<Option<Entry>, AppError> {
        let sql = format!("{ENTRY_SELECT} WHERE e.id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => {
                let likes = self.entry_likes(id).await?;
                Ok(Some(entry_from_row(&row, likes)))
            }
            None => Ok(None),
        }
    }

    /// List entries, with the total for pagination.
    ///
    /// The DEBE view restricts to yesterday's local calendar day and ranks by
    /// like count descending, id ascending on ties so the order is
    /// deterministic.
    pub async fn list_entries(
        &self,
        filter: &EntryFilter,
        page: PageParams,
    ) -> Result<(Vec<Entry>, i64), AppError> {
        let mut conditions: Vec<&str> = Vec::new();
        if filter.topic_id.is_some() {
            conditions.push("e.topic_id = ?");
        }
        let window = if filter.debe {
            conditions.push("e.created_at >= ?");
            conditions.push("e.created_at < ?");
            let (start, end) = debe_window();
            Some((start.to_rfc3339(), end.to_rfc3339()))
        } else {
            None
        };
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let sql = if filter.debe {
            format!(
                "{ENTRY_SELECT}\nLEFT JOIN entry_likes l ON l.entry_id = e.id{where_clause} GROUP BY e.id ORDER BY COUNT(l.user_id) DESC, e.id ASC LIMIT ? OFFSET ?"
            )
        } else {
            format!("{ENTRY_SELECT}{where_clause} ORDER BY e.created_at DESC LIMIT ? OFFSET ?")
        };

        let mut query = sqlx::query(&sql);
        if let Some(topic_id) = &filter.topic_id {
            query = query.bind(topic_id);
        }
        if let Some((start, end)) = &window {
            query = query.bind(start).bind(end);
        }
        let rows = query
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let likes = self.entry_likes(&id).await?;
            entries.push(entry_from_row(row, likes));
        }

        let count_sql = format!("SELECT COUNT(*) AS total FROM entries e{where_clause}");
        let mut count_query = sqlx::query(&count_sql);
        if let Some(topic_id) = &filter.topic_id {
            count_query = count_query.bind(topic_id);
        }
        if let Some((start, end)) = &window {
            count_query = count_query.bind(start).bind(end);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("total");

        Ok((entries, total))
    }

    /// Create an entry under an existing topic.
    ///
    /// The entry-count bump happens after the insert as an atomic increment.
    /// If it fails the entry stands and the count is allowed to drift low;
    /// the count is a display aggregate, not a source of truth.
    pub async fn create_entry(
        &self,
        content: &str,
        author: &CurrentUser,
        topic: &Topic,
    ) -> Result<Entry, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO entries (id, content, author_id, topic_id, is_edited, is_featured, created_at, updated_at) VALUES (?, ?, ?, ?, 0, 0, ?, ?)"
        )
        .bind(&id)
        .bind(content)
        .bind(&author.id)
        .bind(&topic.id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if let Err(e) = self.increment_entry_count(&topic.id).await {
            tracing::warn!("Failed to increment entry count for topic {}: {}", topic.id, e);
        }

        Ok(Entry {
            id,
            content: content.to_string(),
            author: AuthorRef {
                id: author.id.clone(),
                username: author.username.clone(),
                display_name: author.display_name.clone(),
            },
            topic: TopicRef {
                id: topic.id.clone(),
                title: topic.title.clone(),
                slug: topic.slug.clone(),
            },
            likes: Vec::new(),
            is_edited: false,
            is_featured: false,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    // ==================== LIKE OPERATIONS ====================

    /// Whether a user currently likes an entry.
    pub async fn is_liked(&self, entry_id: &str, user_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM entry_likes WHERE entry_id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Add a user to an entry's liker set. Atomic set-add: inserting an
    /// already-present pair is a storage-level no-op.
    pub async fn add_like(&self, entry_id: &str, user_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT OR IGNORE INTO entry_likes (entry_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove a user from an entry's liker set. Atomic set-remove.
    pub async fn remove_like(&self, entry_id: &str, user_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM entry_likes WHERE entry_id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The liker set of an entry, in like order.
    async fn entry_likes(&self, entry_id: &str) -> Result<Vec<String>, AppError> {
        let rows =
            sqlx::query("SELECT user_id FROM entry_likes WHERE entry_id = ? ORDER BY created_at, user_id")
                .bind(entry_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }

    // ==================== COMMENT OPERATIONS ====================

    /// Create a comment on an existing entry.
    pub async fn create_comment(
        &self,
        content: &str,
        author: &CurrentUser,
        entry_id: &str,
    ) -> Result<Comment, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO comments (id, content, author_id, entry_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(content)
        .bind(&author.id)
        .bind(entry_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Comment {
            id,
            content: content.to_string(),
            author: AuthorRef {
                id: author.id.clone(),
                username: author.username.clone(),
                display_name: author.display_name.clone(),
            },
            entry_id: entry_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// List the comments of an entry, newest first, with the total.
    pub async fn list_comments(
        &self,
        entry_id: &str,
        page: PageParams,
    ) -> Result<(Vec<Comment>, i64), AppError> {
        let sql =
            format!("{COMMENT_SELECT} WHERE c.entry_id = ? ORDER BY c.created_at DESC LIMIT ? OFFSET ?");
        let rows = sqlx::query(&sql)
            .bind(entry_id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM comments WHERE entry_id = ?")
            .bind(entry_id)
            .fetch_one(&self.pool)
            .await?
            .get("total");

        Ok((rows.iter().map(comment_from_row).collect(), total))
    }
}

// Day-boundary helpers for the Today and DEBE views. Boundaries are local
// calendar days rendered as RFC3339 UTC strings, comparable with the stored
// timestamps.

fn start_of_local_day(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let local = match midnight.and_local_timezone(Local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Midnight skipped by a DST jump; pin the naive instant as UTC.
        LocalResult::None => Local.from_utc_datetime(&midnight),
    };
    local.with_timezone(&Utc)
}

/// Start of the current local calendar day.
fn today_start() -> DateTime<Utc> {
    start_of_local_day(Local::now().date_naive())
}

/// [yesterday 00:00, today 00:00) in local time.
fn debe_window() -> (DateTime<Utc>, DateTime<Utc>) {
    let today = Local::now().date_naive();
    (start_of_local_day(today - Duration::days(1)), start_of_local_day(today))
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let is_admin: i32 = row.get("is_admin");
    let is_moderator: i32 = row.get("is_moderator");
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        display_name: row.get("display_name"),
        bio: row.get("bio"),
        avatar: row.get("avatar"),
        is_admin: is_admin != 0,
        is_moderator: is_moderator != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn author_from_row(row: &sqlx::sqlite::SqliteRow) -> AuthorRef {
    AuthorRef {
        id: row.get("author_id"),
        username: row.get("author_username"),
        display_name: row.get("author_display_name"),
    }
}

fn topic_from_row(row: &sqlx::sqlite::SqliteRow) -> Topic {
    let is_popular: i32 = row.get("is_popular");
    let is_featured: i32 = row.get("is_featured");
    let tags_str: Option<String> = row.get("tags");
    Topic {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        author: author_from_row(row),
        entry_count: row.get("entry_count"),
        is_popular: is_popular != 0,
        is_featured: is_featured != 0,
        tags: tags_str.map(|s| parse_json_array(&s)).unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow, likes: Vec<String>) -> Entry {
    let is_edited: i32 = row.get("is_edited");
    let is_featured: i32 = row.get("is_featured");
    Entry {
        id: row.get("id"),
        content: row.get("content"),
        author: author_from_row(row),
        topic: TopicRef {
            id: row.get("topic_id"),
            title: row.get("topic_title"),
            slug: row.get("topic_slug"),
        },
        likes,
        is_edited: is_edited != 0,
        is_featured: is_featured != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        content: row.get("content"),
        author: author_from_row(row),
        entry_id: row.get("entry_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

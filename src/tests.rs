//! Integration tests for the sozluk backend.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::relay::{EventKind, NotificationRelay};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    relay: NotificationRelay,
    pool: SqlitePool,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool.clone()));
        let relay = NotificationRelay::new();

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
            relay: relay.clone(),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            relay,
            pool,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> reqwest::Response {
        self.client
            .post(self.url("/api/users/register"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
                "displayName": display_name
            }))
            .send()
            .await
            .unwrap()
    }

    /// Register a user with defaults and log them in; returns (token, user id).
    async fn signup(&self, username: &str) -> (String, String) {
        let resp = self
            .register(
                username,
                &format!("{}@example.com", username),
                "secret1",
                username,
            )
            .await;
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        let user_id = body["id"].as_str().unwrap().to_string();

        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": "secret1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        let token = body["token"].as_str().unwrap().to_string();

        (token, user_id)
    }

    async fn create_topic(&self, token: &str, title: &str, first_entry: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/topics"))
            .bearer_auth(token)
            .json(&json!({ "title": title, "firstEntry": first_entry }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    async fn create_entry(&self, token: &str, topic_id: &str, content: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/entries"))
            .bearer_auth(token)
            .json(&json!({ "content": content, "topicId": topic_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    async fn like(&self, token: &str, entry_id: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/likes"))
            .bearer_auth(token)
            .json(&json!({ "entryId": entry_id }))
            .send()
            .await
            .unwrap()
    }

    async fn set_created_at(&self, table: &str, id: &str, timestamp: &str) {
        let sql = format!("UPDATE {} SET created_at = ? WHERE id = ?", table);
        sqlx::query(&sql)
            .bind(timestamp)
            .bind(id)
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

/// An instant safely inside yesterday's local calendar day (local noon).
fn yesterday_noon() -> String {
    let today_start = Local::now()
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .unwrap()
        .with_timezone(&Utc);
    (today_start - Duration::hours(12)).to_rfc3339()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_register_and_duplicates() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .register("alice", "alice@x.com", "secret1", "Alice")
        .await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["displayName"], "Alice");
    assert_eq!(body["email"], "alice@x.com");
    assert_eq!(body["isAdmin"], false);
    assert_eq!(body["isModerator"], false);
    // The password hash never leaves the server.
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("password").is_none());

    // Same username again
    let resp = fixture
        .register("alice", "other@x.com", "secret1", "Alice Again")
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "DUPLICATE_USERNAME");

    // Same email, different username
    let resp = fixture
        .register("alice2", "alice@x.com", "secret1", "Alice Two")
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "DUPLICATE_EMAIL");
}

#[tokio::test]
async fn test_register_validation() {
    let fixture = TestFixture::new().await;

    // Password too short
    let resp = fixture.register("bob", "bob@x.com", "12345", "Bob").await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Invalid email
    let resp = fixture.register("bob", "not-an-email", "secret1", "Bob").await;
    assert_eq!(resp.status(), 400);

    // Invalid username characters
    let resp = fixture
        .register("bob!", "bob@x.com", "secret1", "Bob")
        .await;
    assert_eq!(resp.status(), 400);

    // Username too short
    let resp = fixture.register("bo", "bob@x.com", "secret1", "Bob").await;
    assert_eq!(resp.status(), 400);

    // Missing fields
    let resp = fixture
        .client
        .post(fixture.url("/api/users/register"))
        .json(&json!({ "username": "bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_login_flow() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .register("bob", "bob@x.com", "secret1", "Bob")
        .await;
    assert_eq!(resp.status(), 201);

    // Valid credentials
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "username": "bob", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["username"], "bob");
    assert_eq!(body["user"]["displayName"], "Bob");
    assert_eq!(body["user"]["isAdmin"], false);

    // Wrong password
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "username": "bob", "password": "wrong-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Unknown user gets the same error
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "username": "nobody", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("carol").await;

    // Token works
    fixture
        .create_topic(&token, "Oturum Testi", "Bu entry oturum testi icindir.")
        .await;

    // Logout
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Token no longer works
    let resp = fixture
        .client
        .post(fixture.url("/api/topics"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Sonraki", "firstEntry": "Bu istek reddedilmeli artik." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_mutations_require_auth() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/topics"))
        .json(&json!({ "title": "Yetkisiz", "firstEntry": "Giris yapmadan deneme." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = fixture
        .client
        .post(fixture.url("/api/entries"))
        .json(&json!({ "content": "Giris yapmadan entry.", "topicId": "t1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .post(fixture.url("/api/likes"))
        .json(&json!({ "entryId": "e1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .post(fixture.url("/api/comments"))
        .json(&json!({ "content": "Giris yok.", "entryId": "e1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_topic_with_first_entry() {
    let fixture = TestFixture::new().await;
    let (token, user_id) = fixture.signup("alice").await;

    let body = fixture
        .create_topic(&token, "Kahve", "Kahve hayattır bu konuda hemfikiriz.")
        .await;

    assert_eq!(body["topic"]["slug"], "kahve");
    assert_eq!(body["topic"]["title"], "Kahve");
    assert_eq!(body["topic"]["entryCount"], 1);
    assert_eq!(body["topic"]["author"]["id"], user_id.as_str());
    assert_eq!(body["topic"]["author"]["username"], "alice");

    assert_eq!(body["entry"]["content"], "Kahve hayattır bu konuda hemfikiriz.");
    assert_eq!(body["entry"]["topic"]["slug"], "kahve");
    assert_eq!(body["entry"]["likes"].as_array().unwrap().len(), 0);
    assert_eq!(body["entry"]["isEdited"], false);

    // Topic is retrievable by slug
    let resp = fixture
        .client
        .get(fixture.url("/api/topics/kahve"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let topic: Value = resp.json().await.unwrap();
    assert_eq!(topic["title"], "Kahve");
    assert_eq!(topic["entryCount"], 1);
}

#[tokio::test]
async fn test_duplicate_slug() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("alice").await;

    fixture
        .create_topic(&token, "Kahve", "Kahve hayattır bu konuda hemfikiriz.")
        .await;

    // Different title, same normalized slug
    let resp = fixture
        .client
        .post(fixture.url("/api/topics"))
        .bearer_auth(&token)
        .json(&json!({ "title": "KAHVE!", "firstEntry": "Ben de kahve hakkinda yazacaktim." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "DUPLICATE_SLUG");
}

#[tokio::test]
async fn test_topic_validation() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("alice").await;

    // Title too short
    let resp = fixture
        .client
        .post(fixture.url("/api/topics"))
        .bearer_auth(&token)
        .json(&json!({ "title": "ab", "firstEntry": "Bu entry yeterince uzun aslinda." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // First entry too short
    let resp = fixture
        .client
        .post(fixture.url("/api/topics"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Gecerli Baslik", "firstEntry": "kisa" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Title with no representable characters
    let resp = fixture
        .client
        .post(fixture.url("/api/topics"))
        .bearer_auth(&token)
        .json(&json!({ "title": "!!!", "firstEntry": "Bu entry yeterince uzun aslinda." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_entry_creation_maintains_count() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("alice").await;

    let body = fixture
        .create_topic(&token, "Sayac Testi", "Ilk entry sayaci bir yapar.")
        .await;
    let topic_id = body["topic"]["id"].as_str().unwrap().to_string();

    fixture
        .create_entry(&token, &topic_id, "Ikinci entry sayaci iki yapar.")
        .await;
    fixture
        .create_entry(&token, &topic_id, "Ucuncu entry sayaci uc yapar.")
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/topics/sayac-testi"))
        .send()
        .await
        .unwrap();
    let topic: Value = resp.json().await.unwrap();
    assert_eq!(topic["entryCount"], 3);

    // The count matches the actual number of entries
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/entries?topic={}", topic_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["entries"].as_array().unwrap().len(), 3);

    // Entry too short
    let resp = fixture
        .client
        .post(fixture.url("/api/entries"))
        .bearer_auth(&token)
        .json(&json!({ "content": "kisa", "topicId": topic_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown topic
    let resp = fixture
        .client
        .post(fixture.url("/api/entries"))
        .bearer_auth(&token)
        .json(&json!({ "content": "Olmayan bir basliga entry.", "topicId": "no-such-topic" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_like_state_machine() {
    let fixture = TestFixture::new().await;
    let (alice_token, _) = fixture.signup("alice").await;
    let (bob_token, bob_id) = fixture.signup("bob").await;

    let body = fixture
        .create_topic(&alice_token, "Begeni Testi", "Bu entry begenilmek icin var.")
        .await;
    let entry_id = body["entry"]["id"].as_str().unwrap().to_string();

    // Like from a second user
    let resp = fixture.like(&bob_token, &entry_id).await;
    assert_eq!(resp.status(), 200);
    let entry: Value = resp.json().await.unwrap();
    let likes = entry["likes"].as_array().unwrap();
    assert_eq!(likes.len(), 1);
    assert_eq!(likes[0], bob_id.as_str());
    assert_eq!(entry["author"]["username"], "alice");
    assert_eq!(entry["topic"]["slug"], "begeni-testi");

    // Liking again fails, and the set still holds the user exactly once
    let resp = fixture.like(&bob_token, &entry_id).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "ALREADY_LIKED");

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/entries/{}", entry_id)))
        .send()
        .await
        .unwrap();
    let entry: Value = resp.json().await.unwrap();
    assert_eq!(entry["likes"].as_array().unwrap().len(), 1);

    // Unlike
    let resp = fixture
        .client
        .delete(fixture.url("/api/likes"))
        .bearer_auth(&bob_token)
        .query(&[("entryId", entry_id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let entry: Value = resp.json().await.unwrap();
    assert_eq!(entry["likes"].as_array().unwrap().len(), 0);

    // Unliking without a like fails
    let resp = fixture
        .client
        .delete(fixture.url("/api/likes"))
        .bearer_auth(&bob_token)
        .query(&[("entryId", entry_id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_LIKED");

    // Unknown entry
    let resp = fixture.like(&bob_token, "no-such-entry").await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_comments() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("alice").await;

    let body = fixture
        .create_topic(&token, "Yorum Testi", "Bu entry yorumlanmak icin var.")
        .await;
    let entry_id = body["entry"]["id"].as_str().unwrap().to_string();

    // Create a comment
    let resp = fixture
        .client
        .post(fixture.url("/api/comments"))
        .bearer_auth(&token)
        .json(&json!({ "content": "katiliyorum", "entryId": entry_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let comment: Value = resp.json().await.unwrap();
    assert_eq!(comment["content"], "katiliyorum");
    assert_eq!(comment["author"]["username"], "alice");
    assert_eq!(comment["entryId"], entry_id.as_str());

    // List comments
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/comments?entryId={}", entry_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["comments"][0]["content"], "katiliyorum");

    // Missing entry id
    let resp = fixture
        .client
        .get(fixture.url("/api/comments"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown entry
    let resp = fixture
        .client
        .get(fixture.url("/api/comments?entryId=no-such-entry"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Comment too long
    let resp = fixture
        .client
        .post(fixture.url("/api/comments"))
        .bearer_auth(&token)
        .json(&json!({ "content": "a".repeat(1001), "entryId": entry_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_entry_pagination() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("alice").await;

    let body = fixture
        .create_topic(&token, "Sayfalama", "Sayfalama testinin ilk entrysi.")
        .await;
    let topic_id = body["topic"]["id"].as_str().unwrap().to_string();

    let mut ids = vec![body["entry"]["id"].as_str().unwrap().to_string()];
    for i in 2..=45 {
        let entry = fixture
            .create_entry(
                &token,
                &topic_id,
                &format!("Sayfalama testinin {} numarali entrysi.", i),
            )
            .await;
        ids.push(entry["id"].as_str().unwrap().to_string());
    }

    // Backdate entries so ordering is strict: ids[0] newest, ids[44] oldest.
    let base = Utc::now();
    for (i, id) in ids.iter().enumerate() {
        let timestamp = (base - Duration::seconds(i as i64)).to_rfc3339();
        fixture.set_created_at("entries", id, &timestamp).await;
    }

    // Page 2 of 45 items at limit 20 holds items 21-40
    let resp = fixture
        .client
        .get(fixture.url(&format!(
            "/api/entries?topic={}&limit=20&page=2",
            topic_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 20);
    assert_eq!(body["pagination"]["total"], 45);
    assert_eq!(body["pagination"]["page"], 2);
    assert_eq!(body["pagination"]["limit"], 20);
    assert_eq!(body["pagination"]["pages"], 3);

    let returned: Vec<&str> = entries.iter().map(|e| e["id"].as_str().unwrap()).collect();
    let expected: Vec<&str> = ids[20..40].iter().map(String::as_str).collect();
    assert_eq!(returned, expected);

    // Junk paging values fall back to defaults instead of failing
    let resp = fixture
        .client
        .get(fixture.url(&format!(
            "/api/entries?topic={}&limit=abc&page=-3",
            topic_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 20);
    assert_eq!(body["entries"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_debe_view() {
    let fixture = TestFixture::new().await;
    let (alice_token, _) = fixture.signup("alice").await;
    let (bob_token, _) = fixture.signup("bob").await;
    let (carol_token, _) = fixture.signup("carol").await;

    let body = fixture
        .create_topic(&alice_token, "Dunun Konusu", "Dunden kalma ilk entry burada.")
        .await;
    let topic_id = body["topic"]["id"].as_str().unwrap().to_string();
    let e1 = body["entry"]["id"].as_str().unwrap().to_string();

    let e2 = fixture
        .create_entry(&alice_token, &topic_id, "Dunden kalma ikinci entry burada.")
        .await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let e3 = fixture
        .create_entry(&alice_token, &topic_id, "Dunden kalma ucuncu entry burada.")
        .await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let e4 = fixture
        .create_entry(&alice_token, &topic_id, "Bugunun entrysi debede gorunmez.")
        .await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let e5 = fixture
        .create_entry(&alice_token, &topic_id, "Dunden kalma dorduncu entry burada.")
        .await["id"]
        .as_str()
        .unwrap()
        .to_string();

    // e1, e2, e3 and e5 belong to yesterday; e4 stays today.
    let yesterday = yesterday_noon();
    for id in [&e1, &e2, &e3, &e5] {
        fixture.set_created_at("entries", id, &yesterday).await;
    }

    // Likes: e2 gets two, e1 and e5 one each (tie), e3 none. e4 gets two
    // but is outside the window.
    assert_eq!(fixture.like(&bob_token, &e2).await.status(), 200);
    assert_eq!(fixture.like(&carol_token, &e2).await.status(), 200);
    assert_eq!(fixture.like(&bob_token, &e1).await.status(), 200);
    assert_eq!(fixture.like(&carol_token, &e5).await.status(), 200);
    assert_eq!(fixture.like(&bob_token, &e4).await.status(), 200);
    assert_eq!(fixture.like(&carol_token, &e4).await.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/entries?debe=true"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(body["pagination"]["total"], 4);
    assert_eq!(entries.len(), 4);

    let returned: Vec<&str> = entries.iter().map(|e| e["id"].as_str().unwrap()).collect();

    // Most liked first; the 1-like tie breaks on id ascending; zero-like
    // entries from the window still appear.
    let (tied_first, tied_second) = if e1 < e5 {
        (e1.as_str(), e5.as_str())
    } else {
        (e5.as_str(), e1.as_str())
    };
    assert_eq!(returned, vec![e2.as_str(), tied_first, tied_second, e3.as_str()]);

    // Today's entry never leaks into DEBE
    assert!(!returned.contains(&e4.as_str()));
}

#[tokio::test]
async fn test_popular_topics_view() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("alice").await;

    let a = fixture
        .create_topic(&token, "Populer A", "A basliginin ilk entrysi burada.")
        .await;
    let a_id = a["topic"]["id"].as_str().unwrap().to_string();
    let b = fixture
        .create_topic(&token, "Siradan B", "B basliginin ilk entrysi burada.")
        .await;
    let _b_id = b["topic"]["id"].as_str().unwrap().to_string();
    let c = fixture
        .create_topic(&token, "Populer C", "C basliginin ilk entrysi burada.")
        .await;
    let c_id = c["topic"]["id"].as_str().unwrap().to_string();

    // A gets three entries in total, C two.
    fixture
        .create_entry(&token, &a_id, "A basligina ikinci entry geldi.")
        .await;
    fixture
        .create_entry(&token, &a_id, "A basligina ucuncu entry geldi.")
        .await;
    fixture
        .create_entry(&token, &c_id, "C basligina ikinci entry geldi.")
        .await;

    // The popular flag is moderation-set; there is no API for it.
    for id in [&a_id, &c_id] {
        sqlx::query("UPDATE topics SET is_popular = 1 WHERE id = ?")
            .bind(id)
            .execute(&fixture.pool)
            .await
            .unwrap();
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/topics?popular=true"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let topics = body["topics"].as_array().unwrap();
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(topics.len(), 2);

    // Ranked by entry count descending; the unflagged topic is absent.
    assert_eq!(topics[0]["id"], a_id.as_str());
    assert_eq!(topics[0]["entryCount"], 3);
    assert_eq!(topics[1]["id"], c_id.as_str());
    assert_eq!(topics[1]["entryCount"], 2);
}

#[tokio::test]
async fn test_today_topics_view() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("alice").await;

    let fresh = fixture
        .create_topic(&token, "Bugunun Basligi", "Bugun acilan baslik goruntulenir.")
        .await;
    let fresh_id = fresh["topic"]["id"].as_str().unwrap().to_string();
    let stale = fixture
        .create_topic(&token, "Eski Baslik", "Iki gun once acilmis bir baslik.")
        .await;
    let stale_id = stale["topic"]["id"].as_str().unwrap().to_string();

    // Push the second topic two days back
    let two_days_ago = (Utc::now() - Duration::days(2)).to_rfc3339();
    fixture
        .set_created_at("topics", &stale_id, &two_days_ago)
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/topics?today=true"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let topics = body["topics"].as_array().unwrap();
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(topics[0]["id"], fresh_id.as_str());

    // The default listing still holds both, newest first
    let resp = fixture
        .client
        .get(fixture.url("/api/topics"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let topics = body["topics"].as_array().unwrap();
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(topics[0]["id"], fresh_id.as_str());
    assert_eq!(topics[1]["id"], stale_id.as_str());
}

#[tokio::test]
async fn test_topic_tags_are_trimmed() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("alice").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/topics"))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Etiketli Baslik",
            "tags": [" kahve ", "içecek", "  "],
            "firstEntry": "Etiketler kirpilarak saklanmali."
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["topic"]["tags"], json!(["kahve", "içecek"]));

    // Tags survive the round-trip through storage
    let resp = fixture
        .client
        .get(fixture.url("/api/topics/etiketli-baslik"))
        .send()
        .await
        .unwrap();
    let topic: Value = resp.json().await.unwrap();
    assert_eq!(topic["tags"], json!(["kahve", "içecek"]));
}

#[tokio::test]
async fn test_relay_publishes_change_events() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.signup("alice").await;

    let mut rx = fixture.relay.subscribe();

    // Topic creation broadcasts the topic and its first entry
    let body = fixture
        .create_topic(&token, "Olay Testi", "Bu entry olay yayinini tetikler.")
        .await;
    let topic_id = body["topic"]["id"].as_str().unwrap().to_string();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event, EventKind::TopicUpdated);
    assert_eq!(event.data["id"], topic_id.as_str());
    let event = rx.recv().await.unwrap();
    assert_eq!(event.event, EventKind::NewEntry);

    // Entry creation carries the originating client id
    let resp = fixture
        .client
        .post(fixture.url("/api/entries"))
        .bearer_auth(&token)
        .header("x-client-id", "observer-7")
        .json(&json!({
            "content": "Bu entry kimligiyle yayinlanir.",
            "topicId": topic_id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event, EventKind::NewEntry);
    assert_eq!(event.origin.as_deref(), Some("observer-7"));
    assert_eq!(event.data["content"], "Bu entry kimligiyle yayinlanir.");
}

#[tokio::test]
async fn test_not_found() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/topics/no-such-slug"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let resp = fixture
        .client
        .get(fixture.url("/api/entries/no-such-entry"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

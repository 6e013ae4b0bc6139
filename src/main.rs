//! Sozluk Backend
//!
//! A production-grade REST backend for a collaborative sozluk-style discussion
//! platform: topics, entries, comments, likes, with SQLite persistence and a
//! realtime change-event relay.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod relay;
mod slug;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use relay::NotificationRelay;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub relay: NotificationRelay,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sozluk Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    match repo.purge_expired_sessions().await {
        Ok(purged) if purged > 0 => tracing::info!("Purged {} expired sessions", purged),
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to purge expired sessions: {}", e),
    }

    // Create application state
    let state = AppState {
        repo,
        relay: NotificationRelay::new(),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Topics
        .route("/topics", get(api::list_topics))
        .route("/topics", post(api::create_topic))
        .route("/topics/{slug}", get(api::get_topic))
        // Entries
        .route("/entries", get(api::list_entries))
        .route("/entries", post(api::create_entry))
        .route("/entries/{id}", get(api::get_entry))
        // Likes
        .route("/likes", post(api::like_entry))
        .route("/likes", delete(api::unlike_entry))
        // Comments
        .route("/comments", get(api::list_comments))
        .route("/comments", post(api::create_comment))
        // Users & sessions
        .route("/users/register", post(api::register))
        .route("/auth/login", post(api::login))
        .route("/auth/logout", post(api::logout))
        // Realtime observers
        .route("/events", get(api::events_ws));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;

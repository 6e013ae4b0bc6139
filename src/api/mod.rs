//! REST API module.
//!
//! Thin transport adapters over the repository: parse and validate input,
//! call into the core, publish relay events, shape the response.

mod auth;
mod comments;
mod entries;
mod events;
mod likes;
mod topics;
mod users;

pub use auth::*;
pub use comments::*;
pub use entries::*;
pub use events::*;
pub use likes::*;
pub use topics::*;
pub use users::*;

use axum::http::HeaderMap;

use crate::errors::AppError;

/// Header observers use to identify themselves so the relay never echoes
/// their own mutations back at them.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Handler result type; errors render through `AppError`'s response mapping.
pub type ApiResult<T> = Result<T, AppError>;

/// Extract the originating client id, if the request carries one.
pub fn client_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

//! HTTP route handlers.

pub mod comments;
pub mod health;
pub mod posts;
pub mod subscriptions;
pub mod users;

use serde::Deserialize;

/// Optional text filter for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub query: Option<String>,
}

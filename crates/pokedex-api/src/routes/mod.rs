//! HTTP route handlers.

pub mod pokemon;
pub mod search;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// Client-facing routes, mounted at the root.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().merge(pokemon::routes()).merge(search::routes())
}

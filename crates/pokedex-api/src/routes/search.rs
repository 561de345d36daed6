//! Name-prefix search route.
//!
//! ## Routes
//!
//! - `GET /search/:name` - Autocomplete matches from the local store

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use pokedex_core::model::SearchMatch;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Creates search routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/search/:name", get(search))
}

/// Prefix search for autocompletion.
///
/// GET /search/:name
#[utoipa::path(
    get,
    path = "/search/{name}",
    tag = "search",
    params(
        ("name" = String, Path, description = "Name prefix to match")
    ),
    responses(
        (status = 200, description = "Matches with name, height, and weight", body = Vec<SearchMatch>),
        (status = 500, description = "Store failure", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn search(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<SearchMatch>>> {
    tracing::info!(prefix = %name, "Searching pokemon by prefix");

    let matches = state
        .store()
        .search_prefix(&name)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(matches))
}

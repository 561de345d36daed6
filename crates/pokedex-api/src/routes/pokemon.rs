//! Pokemon range and detail routes.
//!
//! ## Routes
//!
//! - `GET /pokemon?start=&end=` - Range listing, sorted ascending by id
//! - `GET /pokemon/:name` - Detail lookup by name or numeric id

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::IntoParams;

use pokedex_core::model::PokemonDetail;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Query parameters for the range listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct RangeParams {
    /// First identifier in the range (inclusive).
    pub start: Option<i64>,
    /// Last identifier in the range (inclusive).
    pub end: Option<i64>,
}

/// Creates pokemon routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pokemon", get(get_range))
        .route("/pokemon/:name", get(get_detail))
}

/// Range listing.
///
/// GET /pokemon?start=&end=
#[utoipa::path(
    get,
    path = "/pokemon",
    tag = "pokemon",
    params(RangeParams),
    responses(
        (status = 200, description = "Summaries sorted ascending by id", body = Vec<pokedex_core::model::PokemonSummary>),
        (status = 400, description = "Invalid or missing range bounds", body = crate::error::ApiErrorBody),
        (status = 502, description = "Every lookup in the range failed", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn get_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> ApiResult<Response> {
    let start = params
        .start
        .ok_or_else(|| ApiError::bad_request("start query parameter is required"))?;
    let end = params
        .end
        .ok_or_else(|| ApiError::bad_request("end query parameter is required"))?;

    tracing::info!(start, end, "Fetching pokemon range");

    let outcome = state
        .aggregator()
        .fetch_range(start, end)
        .await
        .map_err(ApiError::from)?;

    if outcome.entries.is_empty() && !outcome.failures.is_empty() {
        let first = &outcome.failures[0];
        return Err(ApiError::bad_gateway(format!(
            "all {} lookups failed (id {}: {})",
            outcome.failures.len(),
            first.id,
            first.reason
        )));
    }

    if outcome.is_complete() {
        return Ok(Json(outcome.entries).into_response());
    }

    crate::metrics::record_partial_range(outcome.failures.len());
    let failed_ids = outcome
        .failures
        .iter()
        .map(|f| f.id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    tracing::warn!(failed_ids = %failed_ids, "range completed partially");

    let mut response = Json(outcome.entries).into_response();
    if let Ok(value) = HeaderValue::from_str(&failed_ids) {
        response.headers_mut().insert("x-failed-ids", value);
    }
    Ok(response)
}

/// Detail lookup by name or id.
///
/// GET /pokemon/:name
#[utoipa::path(
    get,
    path = "/pokemon/{name}",
    tag = "pokemon",
    params(
        ("name" = String, Path, description = "Pokemon name or numeric id")
    ),
    responses(
        (status = 200, description = "Detail payload with flavor text", body = PokemonDetail),
        (status = 404, description = "Unknown pokemon", body = crate::error::ApiErrorBody),
        (status = 502, description = "Upstream failure", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn get_detail(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<PokemonDetail>> {
    tracing::info!(name = %name, "Fetching pokemon detail");

    // The upstream detail and the local flavor rows are independent; fetch
    // them concurrently.
    let lookup = state.lookup();
    let store = state.store();
    let (detail, flavor) = tokio::join!(
        lookup.detail(&name),
        store.flavor_text(&name)
    );

    let mut detail = detail.map_err(ApiError::from)?;
    detail.text = match flavor {
        Ok(rows) => rows,
        Err(err) => {
            // Flavor text is garnish; the upstream payload still renders.
            tracing::warn!(name = %name, error = %err, "flavor text lookup failed");
            Vec::new()
        }
    };

    Ok(Json(detail))
}

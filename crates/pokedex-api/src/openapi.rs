//! `OpenAPI` specification generation for the pokedex API.
//!
//! The generated spec is served at `/openapi.json` and used to generate the
//! client application's API bindings.

use utoipa::OpenApi;

/// `OpenAPI` documentation for the client-facing routes.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pokedex API",
        version = "0.1.0",
        description = "Aggregating proxy over the upstream creature catalog and the local flavor database"
    ),
    paths(
        crate::routes::pokemon::get_range,
        crate::routes::pokemon::get_detail,
        crate::routes::search::search,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            pokedex_core::model::PokemonSummary,
            pokedex_core::model::PokemonDetail,
            pokedex_core::model::DetailSprites,
            pokedex_core::model::DetailStat,
            pokedex_core::model::DetailType,
            pokedex_core::model::NamedRef,
            pokedex_core::model::FlavorText,
            pokedex_core::model::SearchMatch,
        )
    ),
    tags(
        (name = "pokemon", description = "Range listing and detail lookup"),
        (name = "search", description = "Name-prefix autocomplete"),
    )
)]
pub struct ApiDoc;

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Returns the generated `OpenAPI` spec serialized as pretty JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen).
pub fn openapi_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&openapi())
}

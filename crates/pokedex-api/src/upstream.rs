//! HTTP client for the upstream creature-catalog API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::Instrument;

use pokedex_core::model::{
    DetailSprites, DetailStat, DetailType, NamedRef, PokemonDetail, PokemonSummary,
};
use pokedex_core::observability::lookup_span;
use pokedex_core::{Error, Result};

/// By-identifier (or by-name) lookup against the upstream catalog.
///
/// The aggregator and the detail route consume this seam; tests swap in
/// in-process fakes.
#[async_trait]
pub trait PokemonLookup: Send + Sync {
    /// Fetches the abridged summary for one upstream identifier.
    async fn summary(&self, id: u32) -> Result<PokemonSummary>;

    /// Fetches the detail payload for a name or numeric identifier.
    ///
    /// The returned detail carries no flavor text; the caller merges rows
    /// from the local store.
    async fn detail(&self, target: &str) -> Result<PokemonDetail>;
}

/// Upstream summary payload, as the catalog API returns it.
#[derive(Debug, Deserialize)]
struct SummaryPayload {
    id: u32,
    name: String,
    #[serde(default)]
    types: Vec<TypeSlot>,
    #[serde(default)]
    sprites: SpriteSet,
}

#[derive(Debug, Default, Deserialize)]
struct SpriteSet {
    #[serde(default)]
    front_default: Option<String>,
    #[serde(default)]
    back_default: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TypeSlot {
    #[serde(rename = "type")]
    kind: NamedRef,
}

#[derive(Debug, Deserialize)]
struct StatSlot {
    base_stat: i64,
    stat: NamedRef,
}

/// Upstream detail payload, limited to the fields the client renders.
#[derive(Debug, Deserialize)]
struct DetailPayload {
    #[serde(default)]
    sprites: SpriteSet,
    #[serde(default)]
    stats: Vec<StatSlot>,
    #[serde(default)]
    types: Vec<TypeSlot>,
}

/// HTTP client for the upstream catalog service.
#[derive(Clone)]
pub struct PokeApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl PokeApiClient {
    /// Creates a new client targeting the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn pokemon_url(&self, target: &str) -> String {
        format!("{}/pokemon/{target}", self.base_url)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, target: &str) -> Result<T> {
        let url = self.pokemon_url(target);
        let request = self.client.get(&url);

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| Error::upstream(format!("lookup of {target} failed: {e}")))?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(Error::not_found(format!("pokemon {target}")));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = extract_message(&body).unwrap_or(body);
                return Err(Error::upstream(format!(
                    "lookup of {target} failed ({status}): {message}"
                )));
            }

            response
                .json::<T>()
                .await
                .map_err(|e| Error::upstream(format!("invalid payload for {target}: {e}")))
        }
        .instrument(lookup_span(target))
        .await
    }
}

/// Pulls a `message` field out of an upstream error body, if it is JSON.
fn extract_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
}

#[async_trait]
impl PokemonLookup for PokeApiClient {
    async fn summary(&self, id: u32) -> Result<PokemonSummary> {
        let url = self.pokemon_url(&id.to_string());
        let payload: SummaryPayload = self.fetch_json(&id.to_string()).await?;

        Ok(PokemonSummary {
            url,
            id: payload.id,
            name: payload.name,
            sprite: payload.sprites.front_default.unwrap_or_default(),
            types: payload.types.into_iter().map(|t| t.kind.name).collect(),
        })
    }

    async fn detail(&self, target: &str) -> Result<PokemonDetail> {
        let payload: DetailPayload = self.fetch_json(target).await?;

        Ok(PokemonDetail {
            text: Vec::new(),
            sprites: DetailSprites {
                front: payload.sprites.front_default,
                back: payload.sprites.back_default,
            },
            stats: payload
                .stats
                .into_iter()
                .map(|s| DetailStat {
                    value: s.base_stat,
                    stat: s.stat,
                })
                .collect(),
            types: payload
                .types
                .into_iter()
                .map(|t| DetailType { kind: t.kind })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;

    async fn spawn_upstream(status: StatusCode, body: serde_json::Value) -> String {
        let app = Router::new().route(
            "/pokemon/:target",
            get(move || {
                let status = status;
                let body = body.clone();
                async move { (status, axum::Json(body)) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}")
    }

    fn sample_summary_body() -> serde_json::Value {
        json!({
            "id": 7,
            "name": "squirtle",
            "types": [
                { "slot": 1, "type": { "name": "water", "url": "https://x/type/11/" } }
            ],
            "sprites": { "front_default": "https://img.example/7.png" }
        })
    }

    #[tokio::test]
    async fn summary_maps_upstream_payload() {
        let base_url = spawn_upstream(StatusCode::OK, sample_summary_body()).await;
        let client = PokeApiClient::new(&base_url, Duration::from_secs(5));

        let summary = client.summary(7).await.expect("summary");
        assert_eq!(summary.id, 7);
        assert_eq!(summary.name, "squirtle");
        assert_eq!(summary.sprite, "https://img.example/7.png");
        assert_eq!(summary.types, vec!["water".to_string()]);
        assert_eq!(summary.url, format!("{base_url}/pokemon/7"));
    }

    #[tokio::test]
    async fn summary_tolerates_missing_sprite() {
        let base_url = spawn_upstream(
            StatusCode::OK,
            json!({ "id": 132, "name": "ditto", "types": [], "sprites": { "front_default": null } }),
        )
        .await;
        let client = PokeApiClient::new(&base_url, Duration::from_secs(5));

        let summary = client.summary(132).await.expect("summary");
        assert_eq!(summary.sprite, "");
        assert!(summary.types.is_empty());
    }

    #[tokio::test]
    async fn missing_pokemon_maps_to_not_found() {
        let base_url = spawn_upstream(StatusCode::NOT_FOUND, json!({})).await;
        let client = PokeApiClient::new(&base_url, Duration::from_secs(5));

        let result = client.summary(99999).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn server_error_maps_to_upstream() {
        let base_url =
            spawn_upstream(StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "boom" })).await;
        let client = PokeApiClient::new(&base_url, Duration::from_secs(5));

        let result = client.summary(1).await;
        match result {
            Err(Error::Upstream { message }) => assert!(message.contains("boom")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_maps_to_upstream() {
        let base_url = spawn_upstream(StatusCode::OK, json!({ "id": "not-a-number" })).await;
        let client = PokeApiClient::new(&base_url, Duration::from_secs(5));

        let result = client.summary(1).await;
        assert!(matches!(result, Err(Error::Upstream { .. })));
    }

    #[tokio::test]
    async fn detail_maps_stats_and_types() {
        let base_url = spawn_upstream(
            StatusCode::OK,
            json!({
                "sprites": { "front_default": "front.png", "back_default": "back.png" },
                "stats": [ { "base_stat": 45, "stat": { "name": "speed" } } ],
                "types": [ { "type": { "name": "grass" } } ]
            }),
        )
        .await;
        let client = PokeApiClient::new(&base_url, Duration::from_secs(5));

        let detail = client.detail("bulbasaur").await.expect("detail");
        assert!(detail.text.is_empty());
        assert_eq!(detail.sprites.front.as_deref(), Some("front.png"));
        assert_eq!(detail.stats[0].value, 45);
        assert_eq!(detail.stats[0].stat.name, "speed");
        assert_eq!(detail.types[0].kind.name, "grass");
    }
}

//! API integration tests.
//!
//! Tests the complete request flow: HTTP → routes → aggregator/store,
//! with an in-process catalog fake standing in for the upstream API.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use pokedex_api::server::ServerBuilder;
use pokedex_api::store::{FlavorStore, MemoryStore};
use pokedex_api::upstream::PokemonLookup;
use pokedex_core::model::{
    DetailSprites, DetailStat, FlavorText, NamedRef, PokemonDetail, PokemonSummary, SearchMatch,
};
use pokedex_core::Error;

/// In-process stand-in for the upstream catalog.
#[derive(Default)]
struct FakeCatalog {
    fail: HashSet<u32>,
}

impl FakeCatalog {
    fn failing(ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            fail: ids.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PokemonLookup for FakeCatalog {
    async fn summary(&self, id: u32) -> pokedex_core::Result<PokemonSummary> {
        if self.fail.contains(&id) {
            return Err(Error::upstream(format!("simulated failure for {id}")));
        }
        Ok(PokemonSummary {
            url: format!("https://upstream.test/pokemon/{id}"),
            id,
            name: format!("pokemon-{id}"),
            sprite: format!("https://upstream.test/sprite/{id}.png"),
            types: vec!["normal".to_string()],
        })
    }

    async fn detail(&self, target: &str) -> pokedex_core::Result<PokemonDetail> {
        if target != "bulbasaur" {
            return Err(Error::not_found(format!("pokemon {target}")));
        }
        Ok(PokemonDetail {
            text: Vec::new(),
            sprites: DetailSprites {
                front: Some("front.png".to_string()),
                back: Some("back.png".to_string()),
            },
            stats: vec![DetailStat {
                value: 45,
                stat: NamedRef {
                    name: "speed".to_string(),
                },
            }],
            types: vec![],
        })
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert_pokemon(SearchMatch {
        name: "bulbasaur".to_string(),
        height: 7,
        weight: 69,
    });
    store.insert_pokemon(SearchMatch {
        name: "butterfree".to_string(),
        height: 11,
        weight: 320,
    });
    store.insert_flavor_text(
        "bulbasaur",
        FlavorText {
            version: 1,
            text: "A strange seed was planted on its back.".to_string(),
        },
    );
    store
        .insert_flavor_text(
            "bulbasaur",
            FlavorText {
                version: 2,
                text: "It can go for days without eating.".to_string(),
            },
        );
    Arc::new(store)
}

fn test_router(catalog: FakeCatalog) -> axum::Router {
    ServerBuilder::new()
        .debug(true)
        .lookup(Arc::new(catalog))
        .store(seeded_store() as Arc<dyn FlavorStore>)
        .build()
        .test_router()
}

mod helpers {
    use super::*;
    use serde::de::DeserializeOwned;

    pub fn make_request(method: Method, uri: &str) -> Result<Request<Body>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .context("build request")
    }

    pub async fn send(
        router: axum::Router,
        request: Request<Body>,
    ) -> Result<axum::response::Response> {
        let response = router
            .oneshot(request)
            .await
            .map_err(|err: std::convert::Infallible| -> anyhow::Error { match err {} })?;
        Ok(response)
    }

    pub async fn response_json<T: DeserializeOwned>(
        response: axum::response::Response,
    ) -> Result<T> {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .context("read response body")?;
        serde_json::from_slice(&body).context("parse JSON body")
    }

    pub async fn get_json<T: DeserializeOwned>(
        router: axum::Router,
        uri: &str,
    ) -> Result<(StatusCode, T)> {
        let response = send(router, make_request(Method::GET, uri)?).await?;
        let status = response.status();
        let value = response_json(response).await?;
        Ok((status, value))
    }
}

#[tokio::test]
async fn range_returns_sorted_bare_array() -> Result<()> {
    let router = test_router(FakeCatalog::default());

    let (status, body): (_, serde_json::Value) =
        helpers::get_json(router, "/pokemon?start=1&end=5").await?;

    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().context("body must be a bare array")?;
    assert_eq!(entries.len(), 5);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry["id"], i as u64 + 1);
        assert!(entry["url"].is_string());
        assert!(entry["name"].is_string());
        assert!(entry["sprite"].is_string());
        assert!(entry["types"].is_array());
    }
    Ok(())
}

#[tokio::test]
async fn range_partial_failure_reports_failed_ids() -> Result<()> {
    let router = test_router(FakeCatalog::failing([3]));

    let response = helpers::send(
        router,
        helpers::make_request(Method::GET, "/pokemon?start=1&end=5")?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let failed = response
        .headers()
        .get("x-failed-ids")
        .context("x-failed-ids header must be present")?;
    assert_eq!(failed.to_str().unwrap(), "3");

    let body: serde_json::Value = helpers::response_json(response).await?;
    let ids: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 4, 5]);
    Ok(())
}

#[tokio::test]
async fn range_with_every_lookup_failing_is_bad_gateway() -> Result<()> {
    let router = test_router(FakeCatalog::failing([1, 2, 3]));

    let (status, body): (_, serde_json::Value) =
        helpers::get_json(router, "/pokemon?start=1&end=3").await?;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM");
    Ok(())
}

#[tokio::test]
async fn inverted_range_is_bad_request() -> Result<()> {
    let router = test_router(FakeCatalog::default());

    let (status, body): (_, serde_json::Value) =
        helpers::get_json(router, "/pokemon?start=5&end=3").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("5"));
    Ok(())
}

#[tokio::test]
async fn missing_bounds_are_bad_request() -> Result<()> {
    let router = test_router(FakeCatalog::default());
    let (status, body): (_, serde_json::Value) =
        helpers::get_json(router, "/pokemon?start=1").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("end"));
    Ok(())
}

#[tokio::test]
async fn single_id_range_returns_one_entry() -> Result<()> {
    let router = test_router(FakeCatalog::default());

    let (status, body): (_, serde_json::Value) =
        helpers::get_json(router, "/pokemon?start=7&end=7").await?;

    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], 7);
    Ok(())
}

#[tokio::test]
async fn detail_merges_flavor_text_from_store() -> Result<()> {
    let router = test_router(FakeCatalog::default());

    let (status, body): (_, serde_json::Value) =
        helpers::get_json(router, "/pokemon/bulbasaur").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sprites"]["front_default"], "front.png");
    assert_eq!(body["Stats"][0]["base_stat"], 45);

    let text = body["Text"].as_array().context("Text must be an array")?;
    assert_eq!(text.len(), 2);
    assert_eq!(text[0]["Version"], 1);
    assert_eq!(text[1]["Version"], 2);
    Ok(())
}

#[tokio::test]
async fn detail_for_unknown_pokemon_is_not_found() -> Result<()> {
    let router = test_router(FakeCatalog::default());

    let (status, body): (_, serde_json::Value) =
        helpers::get_json(router, "/pokemon/missingno").await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn search_returns_prefix_matches() -> Result<()> {
    let router = test_router(FakeCatalog::default());

    let (status, body): (_, serde_json::Value) = helpers::get_json(router, "/search/bu").await?;

    assert_eq!(status, StatusCode::OK);
    let matches = body.as_array().unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["Name"], "bulbasaur");
    assert_eq!(matches[0]["Height"], 7);
    assert_eq!(matches[0]["Weight"], 69);
    assert_eq!(matches[1]["Name"], "butterfree");
    Ok(())
}

#[tokio::test]
async fn search_without_matches_returns_empty_array() -> Result<()> {
    let router = test_router(FakeCatalog::default());

    let (status, body): (_, serde_json::Value) = helpers::get_json(router, "/search/zzz").await?;

    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn preflight_allows_any_origin_by_default() -> Result<()> {
    let router = test_router(FakeCatalog::default());

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/pokemon")
        .header(header::ORIGIN, "https://client.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .context("build request")?;

    let response = helpers::send(router, request).await?;

    assert!(response.status().is_success());
    let allow_origin = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .context("allow-origin header must be present")?;
    assert_eq!(allow_origin.to_str().unwrap(), "*");
    Ok(())
}

#[tokio::test]
async fn simple_request_carries_cors_header() -> Result<()> {
    let router = test_router(FakeCatalog::default());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/pokemon?start=1&end=1")
        .header(header::ORIGIN, "https://client.example")
        .body(Body::empty())
        .context("build request")?;

    let response = helpers::send(router, request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let allow_origin = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .context("allow-origin header must be present")?;
    assert_eq!(allow_origin.to_str().unwrap(), "*");
    Ok(())
}

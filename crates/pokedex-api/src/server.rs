//! API server implementation.
//!
//! Provides health, ready, and the client-facing pokemon endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use pokedex_core::{Error, Result};

use crate::aggregator::RangeAggregator;
use crate::config::{Config, CorsConfig};
use crate::store::{FlavorStore, MemoryStore};
use crate::upstream::{PokeApiClient, PokemonLookup};

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    lookup: Arc<dyn PokemonLookup>,
    store: Arc<dyn FlavorStore>,
    aggregator: RangeAggregator,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("lookup", &"<PokemonLookup>")
            .field("store", &"<FlavorStore>")
            .finish()
    }
}

impl AppState {
    /// Creates new application state over the given collaborators.
    #[must_use]
    pub fn new(config: Config, lookup: Arc<dyn PokemonLookup>, store: Arc<dyn FlavorStore>) -> Self {
        let aggregator =
            RangeAggregator::new(Arc::clone(&lookup), config.upstream.timeout(), config.range);
        Self {
            config,
            lookup,
            store,
            aggregator,
        }
    }

    /// Returns the upstream lookup client.
    #[must_use]
    pub fn lookup(&self) -> Arc<dyn PokemonLookup> {
        Arc::clone(&self.lookup)
    }

    /// Returns the local flavor store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn FlavorStore> {
        Arc::clone(&self.store)
    }

    /// Returns the range aggregator.
    #[must_use]
    pub fn aggregator(&self) -> &RangeAggregator {
        &self.aggregator
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check
/// that doesn't verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Returns 200 OK if the service is ready to accept requests; probes the
/// local store for connectivity.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("store check failed: {e}")),
            }),
        ),
    }
}

/// Serves the generated OpenAPI document.
async fn serve_openapi() -> impl IntoResponse {
    match crate::openapi::openapi_json() {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("failed to render OpenAPI document: {e}"),
        ),
    }
}

// ============================================================================
// Server
// ============================================================================

/// The pokedex API server.
pub struct Server {
    config: Config,
    lookup: Arc<dyn PokemonLookup>,
    store: Arc<dyn FlavorStore>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("lookup", &"<PokemonLookup>")
            .field("store", &"<FlavorStore>")
            .finish()
    }
}

impl Server {
    /// Creates a new server with the given configuration.
    ///
    /// Defaults to the real upstream client and the in-memory store; use
    /// the builder to supply a SQLite store for production.
    #[must_use]
    pub fn new(config: Config) -> Self {
        ServerBuilder::new().config(config).build()
    }

    /// Creates a new `ServerBuilder`.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let state = Arc::new(AppState::new(
            self.config.clone(),
            Arc::clone(&self.lookup),
            Arc::clone(&self.store),
        ));

        let cors = self.build_cors_layer();
        let metrics_layer = middleware::from_fn(crate::metrics::metrics_middleware);

        Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/metrics", get(crate::metrics::serve_metrics))
            .route("/openapi.json", get(serve_openapi))
            .merge(crate::routes::api_routes())
            // Middleware (order matters): metrics outermost for timing, then trace, then CORS.
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(metrics_layer)
            .with_state(state)
    }

    /// Builds the CORS layer from configuration.
    fn build_cors_layer(&self) -> CorsLayer {
        let cors_config = &self.config.cors;
        let cors = Self::build_cors_base(cors_config);
        Self::apply_cors_allowed_origins(cors, cors_config)
    }

    fn build_cors_base(cors_config: &CorsConfig) -> CorsLayer {
        CorsLayer::new()
            // Methods the client application relies on, plus HEAD.
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::OPTIONS,
            ])
            // Headers the client application sends.
            .allow_headers([
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::ACCEPT_ENCODING,
                header::ACCEPT,
                header::AUTHORIZATION,
                header::ORIGIN,
                header::CACHE_CONTROL,
                header::HeaderName::from_static("x-csrf-token"),
                header::HeaderName::from_static("x-requested-with"),
            ])
            // Expose headers the browser needs to read.
            .expose_headers([
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::HeaderName::from_static("x-failed-ids"),
            ])
            .max_age(Duration::from_secs(cors_config.max_age_seconds))
    }

    fn cors_allows_any_origin(cors_config: &CorsConfig) -> bool {
        cors_config.allowed_origins.len() == 1
            && cors_config
                .allowed_origins
                .first()
                .is_some_and(|origin| origin == "*")
    }

    fn parse_cors_origins(cors_config: &CorsConfig) -> Vec<HeaderValue> {
        let mut allowed = Vec::new();
        for origin in &cors_config.allowed_origins {
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push(value),
                Err(_) => {
                    tracing::error!(
                        origin = %origin,
                        "Invalid CORS origin; expected a valid HeaderValue"
                    );
                }
            }
        }
        allowed
    }

    fn apply_cors_allowed_origins(cors: CorsLayer, cors_config: &CorsConfig) -> CorsLayer {
        if cors_config.allowed_origins.is_empty() {
            return cors;
        }

        if Self::cors_allows_any_origin(cors_config) {
            // Wildcard origins cannot carry credentials.
            return cors.allow_origin(Any);
        }

        if cors_config
            .allowed_origins
            .iter()
            .any(|origin| origin == "*")
        {
            tracing::error!(
                origins = ?cors_config.allowed_origins,
                "Invalid CORS config: '*' must be the only allowed origin"
            );
            return cors;
        }

        let allowed = Self::parse_cors_origins(cors_config);

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            tracing::info!(origins = ?cors_config.allowed_origins, "CORS configured");
            cors.allow_origin(AllowOrigin::list(allowed))
                .allow_credentials(true)
        }
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the server
    /// cannot bind to the port.
    pub async fn serve(&self) -> Result<()> {
        self.validate_config()?;

        crate::metrics::init_metrics();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(
            http_port = self.config.http_port,
            upstream = %self.config.upstream.base_url,
            "Starting pokedex API server"
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal {
                message: format!("failed to bind to {addr}: {e}"),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// This is useful for integration tests where you want to exercise
    /// the routes without actually binding to a port.
    #[doc(hidden)]
    #[must_use]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }

    fn validate_config(&self) -> Result<()> {
        if !self.config.debug && self.config.store.db_path.is_none() {
            return Err(Error::InvalidInput(
                "store.db_path is required when debug=false".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Server Builder
// ============================================================================

/// Builder for constructing a server.
pub struct ServerBuilder {
    config: Config,
    lookup: Option<Arc<dyn PokemonLookup>>,
    store: Option<Arc<dyn FlavorStore>>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("lookup", &self.lookup.is_some())
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            lookup: None,
            store: None,
        }
    }
}

impl ServerBuilder {
    /// Creates a new server builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Enables debug mode.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Sets the upstream lookup client used by request handlers.
    ///
    /// By default the server builds a real catalog client from
    /// configuration.
    #[must_use]
    pub fn lookup(mut self, lookup: Arc<dyn PokemonLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Sets the flavor store used by request handlers.
    ///
    /// By default the server uses an in-memory store intended only for
    /// tests/dev.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn FlavorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        let lookup = self.lookup.unwrap_or_else(|| {
            Arc::new(PokeApiClient::new(
                self.config.upstream.base_url.clone(),
                self.config.upstream.timeout(),
            ))
        });
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        Server {
            config: self.config,
            lookup,
            store,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

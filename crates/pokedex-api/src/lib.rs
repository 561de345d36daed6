//! # pokedex-api
//!
//! HTTP composition layer for the pokedex aggregation service.
//!
//! This crate provides the API surface, handling:
//!
//! - **Routing**: HTTP endpoint configuration and CORS
//! - **Aggregation**: the concurrent fan-out range aggregator
//! - **Collaborators**: the upstream catalog client and the local flavor store
//! - **Observability**: metrics, tracing, and health checks
//!
//! ## Endpoints
//!
//! ```text
//! GET /pokemon?start=&end=  - Range listing (sorted by id)
//! GET /pokemon/:name        - Detail lookup by name or id
//! GET /search/:name         - Name-prefix autocomplete
//! GET /health               - Health check
//! GET /ready                - Readiness check
//! GET /metrics              - Prometheus metrics
//! GET /openapi.json         - OpenAPI document
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use pokedex_api::config::Config;
//! use pokedex_api::server::Server;
//!
//! let server = Server::new(Config::from_env()?);
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

pub mod aggregator;
pub mod config;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod store;
pub mod upstream;

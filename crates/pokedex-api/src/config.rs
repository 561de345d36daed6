//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use pokedex_core::{Error, Result};

/// Default upstream catalog base URL.
pub const DEFAULT_UPSTREAM_URL: &str = "https://pokeapi.co/api/v2";

/// Hard ceiling on the configurable range span.
pub const MAX_RANGE_SPAN_LIMIT: u32 = 10_000;

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins. `["*"]` allows any origin; `*` must be the only
    /// entry when present.
    pub allowed_origins: Vec<String>,
    /// Preflight cache duration in seconds.
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age_seconds: 3600,
        }
    }
}

/// Upstream catalog client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Base URL of the upstream catalog API.
    pub base_url: String,
    /// Per-fetch timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl UpstreamConfig {
    /// Returns the per-fetch timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Range aggregation limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RangeConfig {
    /// Deadline for a whole range request in seconds.
    pub deadline_secs: u64,
    /// Largest accepted span (`end - start + 1`) per request.
    pub max_span: u32,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 30,
            max_span: 500,
        }
    }
}

impl RangeConfig {
    /// Returns the whole-range deadline as a `Duration`.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// Local flavor store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite database path. When unset the server falls back to the
    /// in-memory store (debug only).
    #[serde(default)]
    pub db_path: Option<String>,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// HTTP listen port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Debug mode: pretty logs and the in-memory store fallback.
    #[serde(default)]
    pub debug: bool,
    /// CORS settings.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Upstream catalog client settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Range aggregation limits.
    #[serde(default)]
    pub range: RangeConfig,
    /// Local store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_http_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            debug: false,
            cors: CorsConfig::default(),
            upstream: UpstreamConfig::default(),
            range: RangeConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `POKEDEX_HTTP_PORT`
    /// - `POKEDEX_DEBUG`
    /// - `POKEDEX_UPSTREAM_URL`
    /// - `POKEDEX_UPSTREAM_TIMEOUT_SECS`
    /// - `POKEDEX_RANGE_DEADLINE_SECS`
    /// - `POKEDEX_RANGE_MAX_SPAN`
    /// - `POKEDEX_DB_PATH`
    /// - `POKEDEX_CORS_ALLOWED_ORIGINS` (comma-separated, or `*`)
    /// - `POKEDEX_CORS_MAX_AGE_SECONDS`
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot be
    /// parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("POKEDEX_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("POKEDEX_DEBUG")? {
            config.debug = debug;
        }

        if let Some(url) = env_string("POKEDEX_UPSTREAM_URL") {
            config.upstream.base_url = url;
        }
        if let Some(secs) = env_u64("POKEDEX_UPSTREAM_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(Error::InvalidInput(
                    "POKEDEX_UPSTREAM_TIMEOUT_SECS must be greater than 0".to_string(),
                ));
            }
            config.upstream.timeout_secs = secs;
        }

        if let Some(secs) = env_u64("POKEDEX_RANGE_DEADLINE_SECS")? {
            if secs == 0 {
                return Err(Error::InvalidInput(
                    "POKEDEX_RANGE_DEADLINE_SECS must be greater than 0".to_string(),
                ));
            }
            config.range.deadline_secs = secs;
        }
        if let Some(span) = env_u32("POKEDEX_RANGE_MAX_SPAN")? {
            if span == 0 || span > MAX_RANGE_SPAN_LIMIT {
                return Err(Error::InvalidInput(format!(
                    "POKEDEX_RANGE_MAX_SPAN must be between 1 and {MAX_RANGE_SPAN_LIMIT}"
                )));
            }
            config.range.max_span = span;
        }

        if let Some(path) = env_string("POKEDEX_DB_PATH") {
            config.store.db_path = Some(path);
        }

        if let Some(origins) = env_string("POKEDEX_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_cors_allowed_origins(&origins);
        }
        if let Some(max_age) = env_u64("POKEDEX_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }

        Ok(config)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u16: {e}")))
}

fn env_u32(name: &str) -> Result<Option<u32>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u32>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u32: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed == "*" {
        return vec!["*".to_string()];
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

//! `pokedex-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use pokedex_api::config::Config;
use pokedex_api::server::Server;
use pokedex_api::store::{FlavorStore, MemoryStore, SqliteStore};
use pokedex_core::observability::{init_logging, LogFormat};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    init_logging(choose_log_format(&config));

    let store: Arc<dyn FlavorStore> = if let Some(path) = config.store.db_path.as_deref() {
        tracing::info!(path = %path, "Using SQLite flavor store");
        Arc::new(SqliteStore::open(path)?)
    } else {
        if !config.debug {
            anyhow::bail!("POKEDEX_DB_PATH is required when POKEDEX_DEBUG=false");
        }
        tracing::warn!("POKEDEX_DB_PATH not set; using in-memory flavor store (debug only)");
        Arc::new(MemoryStore::new())
    };

    let server = Server::builder().config(config).store(store).build();
    server.serve().await?;
    Ok(())
}

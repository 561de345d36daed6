//! Local flavor store abstraction.
//!
//! The service reads two things from its local database: flavor-text rows
//! for the detail endpoint and name-prefix matches for autocomplete. Both
//! sit behind [`FlavorStore`] so the SQLite implementation and the
//! in-memory test/dev implementation are interchangeable.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use pokedex_core::model::{FlavorText, SearchMatch};
use pokedex_core::{Error, Result};

/// Read interface over the local catalog database.
#[async_trait]
pub trait FlavorStore: Send + Sync {
    /// Returns flavor-text rows for the given name, oldest version first.
    async fn flavor_text(&self, name: &str) -> Result<Vec<FlavorText>>;

    /// Returns autocomplete matches whose name starts with `prefix`.
    async fn search_prefix(&self, prefix: &str) -> Result<Vec<SearchMatch>>;

    /// Shallow connectivity check used by the readiness probe.
    async fn ping(&self) -> Result<()>;
}

// ============================================================================
// SQLite
// ============================================================================

/// SQLite-backed store.
///
/// The connection is shared behind a mutex and queries run on the blocking
/// pool; the workload is two short read-only statements.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or schema creation
    /// fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::store_with_source("failed to open database", e))?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database (tests and debug tooling).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::store_with_source("failed to open in-memory database", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Inserts one flavor-text row. Used by seeding tooling and tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_flavor_text(&self, name: &str, row: &FlavorText) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO flavor_text (name, version, text) VALUES (?1, ?2, ?3)",
            params![name, row.version, row.text],
        )
        .map_err(|e| Error::store_with_source("failed to insert flavor text", e))?;
        Ok(())
    }

    /// Inserts one pokemon row for the search index. Used by seeding tooling
    /// and tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_pokemon(&self, entry: &SearchMatch) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO pokemon (name, height, weight) VALUES (?1, ?2, ?3)",
            params![entry.name, entry.height, entry.weight],
        )
        .map_err(|e| Error::store_with_source("failed to insert pokemon", e))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::store("database connection lock poisoned"))
    }
}

fn setup_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS flavor_text (
             name    TEXT NOT NULL,
             version INTEGER NOT NULL,
             text    TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_flavor_text_name ON flavor_text (name);
         CREATE TABLE IF NOT EXISTS pokemon (
             name   TEXT NOT NULL PRIMARY KEY,
             height INTEGER NOT NULL,
             weight INTEGER NOT NULL
         );",
    )
    .map_err(|e| Error::store_with_source("failed to create schema", e))
}

#[async_trait]
impl FlavorStore for SqliteStore {
    async fn flavor_text(&self, name: &str) -> Result<Vec<FlavorText>> {
        let conn = Arc::clone(&self.conn);
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| Error::store("database connection lock poisoned"))?;
            let mut stmt = conn
                .prepare("SELECT text, version FROM flavor_text WHERE name = ?1 ORDER BY version")
                .map_err(|e| Error::store_with_source("failed to prepare flavor query", e))?;
            let rows = stmt
                .query_map(params![name], |row| {
                    Ok(FlavorText {
                        text: row.get(0)?,
                        version: row.get(1)?,
                    })
                })
                .map_err(|e| Error::store_with_source("flavor query failed", e))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::store_with_source("failed to read flavor rows", e))
        })
        .await
        .map_err(|e| Error::Internal {
            message: format!("store task failed: {e}"),
        })?
    }

    async fn search_prefix(&self, prefix: &str) -> Result<Vec<SearchMatch>> {
        let conn = Arc::clone(&self.conn);
        let pattern = format!("{prefix}%");
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| Error::store("database connection lock poisoned"))?;
            let mut stmt = conn
                .prepare(
                    "SELECT name, weight, height FROM pokemon WHERE name LIKE ?1 ORDER BY name",
                )
                .map_err(|e| Error::store_with_source("failed to prepare search query", e))?;
            let rows = stmt
                .query_map(params![pattern], |row| {
                    Ok(SearchMatch {
                        name: row.get(0)?,
                        weight: row.get(1)?,
                        height: row.get(2)?,
                    })
                })
                .map_err(|e| Error::store_with_source("search query failed", e))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::store_with_source("failed to read search rows", e))
        })
        .await
        .map_err(|e| Error::Internal {
            message: format!("store task failed: {e}"),
        })?
    }

    async fn ping(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| Error::store("database connection lock poisoned"))?;
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(|e| Error::store_with_source("connectivity check failed", e))
        })
        .await
        .map_err(|e| Error::Internal {
            message: format!("store task failed: {e}"),
        })?
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Default)]
struct MemoryTables {
    flavor: Vec<(String, FlavorText)>,
    pokemon: Vec<SearchMatch>,
}

/// In-memory store for tests and debug mode.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one flavor-text row.
    pub fn insert_flavor_text(&self, name: &str, row: FlavorText) {
        let mut tables = self.tables.write().expect("memory store lock");
        tables.flavor.push((name.to_string(), row));
    }

    /// Adds one pokemon row for the search index.
    pub fn insert_pokemon(&self, entry: SearchMatch) {
        let mut tables = self.tables.write().expect("memory store lock");
        tables.pokemon.push(entry);
    }
}

#[async_trait]
impl FlavorStore for MemoryStore {
    async fn flavor_text(&self, name: &str) -> Result<Vec<FlavorText>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| Error::store("memory store lock poisoned"))?;
        let mut rows: Vec<FlavorText> = tables
            .flavor
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by_key(|r| r.version);
        Ok(rows)
    }

    async fn search_prefix(&self, prefix: &str) -> Result<Vec<SearchMatch>> {
        let prefix = prefix.to_ascii_lowercase();
        let tables = self
            .tables
            .read()
            .map_err(|_| Error::store("memory store lock poisoned"))?;
        // Case-insensitive to match SQLite LIKE semantics.
        let mut rows: Vec<SearchMatch> = tables
            .pokemon
            .iter()
            .filter(|p| p.name.to_ascii_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

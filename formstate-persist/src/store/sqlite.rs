//! SQLite-backed store.

use std::path::Path;

use async_sqlite::Client;
use async_sqlite::ClientBuilder;
use async_sqlite::JournalMode;
use async_sqlite::rusqlite;
use async_sqlite::rusqlite::OptionalExtension;
use async_trait::async_trait;

use super::KeyValueStore;
use crate::error::PersistError;

/// A store backed by a SQLite database.
///
/// Values survive process restarts. File databases use WAL journal mode.
///
/// # Example
///
/// ```ignore
/// use formstate_persist::SqliteStore;
///
/// let store = SqliteStore::open("drafts.db").await?;
/// ```
pub struct SqliteStore {
    client: Client,
}

impl SqliteStore {
    /// Opens a store at the specified path, creating the file and table if
    /// they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let client = ClientBuilder::new()
            .path(path)
            .journal_mode(JournalMode::Wal)
            .open()
            .await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    /// Opens an in-memory store. Data is lost when the store is dropped.
    pub async fn open_in_memory() -> Result<Self, PersistError> {
        let client = ClientBuilder::new().path(":memory:").open().await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    async fn init_schema(client: &Client) -> Result<(), async_sqlite::Error> {
        client
            .conn(|conn| {
                conn.execute(
                    "CREATE TABLE IF NOT EXISTS form_values (
                        key TEXT PRIMARY KEY,
                        value TEXT NOT NULL
                    )",
                    [],
                )?;
                Ok(())
            })
            .await
    }

    /// Returns the number of stored values.
    pub async fn len(&self) -> Result<usize, PersistError> {
        let count = self
            .client
            .conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM form_values", [], |row| row.get::<_, i64>(0))
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> Result<bool, PersistError> {
        self.len().await.map(|len| len == 0)
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let key = key.to_string();

        let value = self
            .client
            .conn(move |conn| {
                conn.query_row(
                    "SELECT value FROM form_values WHERE key = ?",
                    [key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
            })
            .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let key = key.to_string();
        let value = value.to_string();

        self.client
            .conn(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO form_values (key, value) VALUES (?, ?)",
                    rusqlite::params![key, value],
                )
            })
            .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        let key = key.to_string();

        self.client
            .conn(move |conn| conn.execute("DELETE FROM form_values WHERE key = ?", [key]))
            .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistError> {
        self.client
            .conn(|conn| conn.execute("DELETE FROM form_values", []))
            .await?;

        Ok(())
    }
}

//! Key-value stores for persisted form values
//!
//! Values are stored as JSON text under string keys. The store does not
//! interpret them; a value that fails to parse is treated as absent by the
//! persistence layer.

mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use async_trait::async_trait;

use crate::error::PersistError;

/// Trait for stores that hold serialized form values.
///
/// # Example
///
/// ```
/// use formstate_persist::{InMemoryStore, KeyValueStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), formstate_persist::PersistError> {
/// let store = InMemoryStore::new();
/// store.set("signup", r#"{"name":"Ada"}"#).await?;
///
/// assert_eq!(store.get("signup").await?.as_deref(), Some(r#"{"name":"Ada"}"#));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), PersistError>;

    /// Removes the value stored under `key`.
    async fn remove(&self, key: &str) -> Result<(), PersistError>;

    /// Removes every value.
    async fn clear(&self) -> Result<(), PersistError>;
}

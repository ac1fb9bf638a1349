//! In-memory store using DashMap

use async_trait::async_trait;
use dashmap::DashMap;

use super::KeyValueStore;
use crate::error::PersistError;

/// A store backed by a concurrent hash map.
///
/// Values are lost when the process exits. Useful for tests and for
/// keeping drafts across screens within one session.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, String>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistError> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_replaces() {
        let store = InMemoryStore::new();
        store.set("k", "1").await.unwrap();
        store.set("k", "2").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = InMemoryStore::new();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}

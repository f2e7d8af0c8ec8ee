//! Extension-local key/value storage.
//!
//! The browser's `storage.local` is modelled as a flat namespace of string keys
//! holding JSON documents. Backends implement the synchronous [`KeyValueStore`]
//! trait; async code goes through [`Storage`], which moves backend calls onto the
//! blocking pool and broadcasts a [`StorageChange`] after every successful write.

pub mod memory;
pub mod sqlite;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Array of `InteractionRecord`.
pub const INTERACTIONS_KEY: &str = "web_interactions";
/// Array of `SummaryRecord`.
pub const SUMMARIES_KEY: &str = "interaction_summaries";
/// The user's `Settings` object.
pub const SETTINGS_KEY: &str = "user_settings";
pub const HIGHLIGHTS_KEY: &str = "mindcache-highlights";
pub const NOTES_KEY: &str = "mindcache-notes";
pub const QUOTES_KEY: &str = "mindcache-quotes";
/// Responses kept from the analytics endpoint.
pub const INSIGHTS_KEY: &str = "ai_insights";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A persistent string → JSON store.
///
/// All methods are synchronous; async callers should use [`Storage`].
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently present, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Notification that `key` was written or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
}

/// Async, cloneable front for a [`KeyValueStore`] with change notifications.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
    changes: broadcast::Sender<StorageChange>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { backend, changes }
    }

    /// Ephemeral storage backed by a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let backend = Arc::clone(&self.backend);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.get(&key))
            .await
            .context("storage task failed")?
    }

    pub async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let owned_key = key.to_string();
        tokio::task::spawn_blocking(move || backend.set(&owned_key, value))
            .await
            .context("storage task failed")??;
        self.notify(key);
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let owned_key = key.to_string();
        tokio::task::spawn_blocking(move || backend.remove(&owned_key))
            .await
            .context("storage task failed")??;
        self.notify(key);
        Ok(())
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.keys())
            .await
            .context("storage task failed")?
    }

    /// Read and deserialize `key`. `None` if the key is absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_value(key).await? {
            Some(value) => {
                let parsed = serde_json::from_value(value)
                    .with_context(|| format!("malformed value under {key}"))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Read `key`, falling back to `T::default()` when absent.
    pub async fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        Ok(self.get(key).await?.unwrap_or_default())
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize value for {key}"))?;
        self.set_value(key, value).await
    }

    fn notify(&self, key: &str) {
        // No subscribers is fine.
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn typed_round_trip_and_default() {
        let storage = Storage::in_memory();
        let missing: Vec<String> = storage.get_or_default("nothing").await.unwrap();
        assert!(missing.is_empty());

        storage.set("list", &vec!["a", "b"]).await.unwrap();
        let list: Vec<String> = storage.get("list").await.unwrap().unwrap();
        assert_eq!(list, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn writes_are_broadcast() {
        let storage = Storage::in_memory();
        let mut rx = storage.subscribe();

        storage.set_value(HIGHLIGHTS_KEY, json!([])).await.unwrap();
        storage.remove(HIGHLIGHTS_KEY).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().key, HIGHLIGHTS_KEY);
        assert_eq!(rx.recv().await.unwrap().key, HIGHLIGHTS_KEY);
        assert!(storage.get_value(HIGHLIGHTS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_value_is_an_error() {
        let storage = Storage::in_memory();
        storage.set_value("n", json!("not a number")).await.unwrap();
        assert!(storage.get::<u32>("n").await.is_err());
    }
}

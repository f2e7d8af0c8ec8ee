use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use super::KeyValueStore;

/// In-process store. Optional per-call latency makes interleavings reproducible.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, Value>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every read and write sleeps for `latency` before touching the data.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            data: Mutex::default(),
            latency: Some(latency),
        }
    }

    fn delay(&self) {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.data
            .lock()
            .map_err(|e| anyhow!("memory store lock poisoned: {e}"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.delay();
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.delay();
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.delay();
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

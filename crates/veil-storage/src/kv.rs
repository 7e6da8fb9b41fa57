//! Key-value store contract

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::Result;

/// Async get/set store holding JSON values.
///
/// Every successful `set` publishes the key on the change feed. Observers
/// must re-read the whole value; notifications carry no deltas.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<String>;
}

/// Process-local store, used in tests and for ephemeral sessions.
pub struct MemoryStore {
    values: RwLock<HashMap<String, serde_json::Value>>,
    changes: broadcast::Sender<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            values: RwLock::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        // No receivers is fine
        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

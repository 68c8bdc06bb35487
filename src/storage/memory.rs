//! In-memory storage for tests and one-off CLI runs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::storage::{Collection, DocumentStore};

#[derive(Default)]
pub struct MemoryStorage {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStorage {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let guard = self.collections.read().await;
        Ok(guard.get(&collection).and_then(|c| c.get(id)).cloned())
    }

    async fn put(&self, collection: Collection, id: &str, doc: Value) -> Result<()> {
        let mut guard = self.collections.write().await;
        guard
            .entry(collection)
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let mut guard = self.collections.write().await;
        Ok(guard
            .get_mut(&collection)
            .is_some_and(|c| c.remove(id).is_some()))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Value>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }
}

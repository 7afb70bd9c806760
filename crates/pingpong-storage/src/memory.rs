//! In-process key-value store for non-persistent deployments and tests.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::RwLock;
use pingpong_traits::{KeyPage, KvStore, StoreError};

use crate::kv_store::page_from_keys;

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of every key, in order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn list_keys(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<KeyPage, StoreError> {
        if limit == 0 {
            return Ok(KeyPage::default());
        }

        let lower = match cursor {
            Some(cursor) if cursor >= prefix => Bound::Excluded(cursor.to_string()),
            _ => Bound::Included(prefix.to_string()),
        };

        let entries = self.entries.read();
        let keys: Vec<String> = entries
            .range((lower, Bound::Unbounded))
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .take(limit)
            .cloned()
            .collect();

        Ok(page_from_keys(keys, limit))
    }
}

//! Storage trait abstraction for persisted conversation state.
//!
//! Implementations are provided by `pingpong-storage`.

use async_trait::async_trait;

use crate::error::StoreError;

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    pub keys: Vec<String>,
    /// Resume point for the next page; `None` once the listing is exhausted.
    pub cursor: Option<String>,
}

/// Shared key-value store with per-key atomic put/delete.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key, returns true if it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// List keys starting with `prefix` in ascending order, strictly after
    /// `cursor` when one is given, at most `limit` per page.
    async fn list_keys(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<KeyPage, StoreError>;
}

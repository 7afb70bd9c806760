//! KV store storage - redb-backed implementation of [`KvStore`].

use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pingpong_traits::{KeyPage, KvStore, StoreError};
use redb::{Database, ReadableDatabase, TableDefinition};
use tracing::debug;

use crate::range_utils::prefix_range;

const KV_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv_store");

/// Embedded key-value storage with byte-level values.
#[derive(Debug, Clone)]
pub struct KvStorage {
    db: Arc<Database>,
}

impl KvStorage {
    /// Open (or create) the database file at `path` and make sure the table exists.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let db = Arc::new(Database::create(path.as_ref())?);
        debug!(path = %path.as_ref().display(), "Opened key-value store");
        Self::new(db)
    }

    pub fn new(db: Arc<Database>) -> anyhow::Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(KV_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn put_raw(&self, key: &str, value: &[u8]) -> Result<(), redb::Error> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KV_TABLE)?;

        if let Some(value) = table.get(key)? {
            Ok(Some(value.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    fn delete_raw(&self, key: &str) -> Result<bool, redb::Error> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(KV_TABLE)?;
            table.remove(key)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn list_page(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<KeyPage, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KV_TABLE)?;

        let (start, end) = prefix_range(prefix);
        let lower = match cursor {
            Some(cursor) if cursor >= start.as_str() => Bound::Excluded(cursor),
            _ => Bound::Included(start.as_str()),
        };
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end.as_str())
        };

        let mut keys = Vec::new();
        for item in table.range::<&str>((lower, upper))? {
            let (key, _) = item?;
            keys.push(key.value().to_string());
            if keys.len() >= limit {
                break;
            }
        }

        Ok(page_from_keys(keys, limit))
    }
}

/// A full page may have more entries behind it; a short page ends the listing.
pub(crate) fn page_from_keys(keys: Vec<String>, limit: usize) -> KeyPage {
    let cursor = if limit > 0 && keys.len() >= limit {
        keys.last().cloned()
    } else {
        None
    };
    KeyPage { keys, cursor }
}

#[async_trait]
impl KvStore for KvStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.get_raw(key).map_err(StoreError::backend)
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.put_raw(key, value).map_err(StoreError::backend)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.delete_raw(key).map_err(StoreError::backend)
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
        self.list_page(prefix, cursor, limit)
            .map_err(StoreError::backend)
    }
}

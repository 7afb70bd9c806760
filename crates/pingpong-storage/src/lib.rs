//! PingPong Storage - Low-level storage layer
//!
//! Key-value backends implementing [`pingpong_traits::KvStore`]:
//!
//! - [`KvStorage`] - redb embedded database, single `kv_store` table
//! - [`MemoryKvStore`] - in-process map, nothing survives a restart
//!
//! Conversation records live under the `conversation:` prefix; higher-level
//! record handling is done by `pingpong-core`.

pub mod kv_store;
pub mod memory;
pub mod range_utils;
pub mod time_utils;

pub use kv_store::KvStorage;
pub use memory::MemoryKvStore;

//! PingPong Traits - Shared trait definitions and core abstractions.
//!
//! This crate provides the shared interfaces used across the PingPong workspace:
//! - AgentRunner, AgentReply, AgentError
//! - KvStore, KeyPage, StoreError
//! - ConversationRecord

pub mod agent;
pub mod error;
pub mod models;
pub mod store;

// ── Top-level re-exports ─────────────────────────────────────────────

pub use agent::AgentRunner;
pub use error::{AgentError, StoreError};
pub use models::{AgentReply, ConversationRecord};
pub use store::{KeyPage, KvStore};

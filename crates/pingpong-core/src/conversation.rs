//! Best-effort persistence of successful exchanges.
//!
//! Records are written under `conversation:<epoch-millis>`; the key suffix is
//! the record's creation time and is what the retention sweeper reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pingpong_traits::{AgentReply, ConversationRecord, KvStore, StoreError};
use tracing::{debug, info, warn};

use crate::config::DeploymentMode;

pub const CONVERSATION_PREFIX: &str = "conversation:";

pub fn conversation_key(epoch_millis: i64) -> String {
    format!("{}{}", CONVERSATION_PREFIX, epoch_millis)
}

/// Creation time encoded in a conversation key: the text after the first `:`.
pub fn parse_conversation_key(key: &str) -> Option<i64> {
    let (_, suffix) = key.split_once(':')?;
    suffix.parse::<i64>().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Not a production deployment; nothing written.
    Skipped,
    Written { key: String },
    /// The write failed and was logged.
    Failed,
}

#[derive(Clone)]
pub struct ConversationStore {
    store: Arc<dyn KvStore>,
    mode: DeploymentMode,
}

impl ConversationStore {
    pub fn new(store: Arc<dyn KvStore>, mode: DeploymentMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> &DeploymentMode {
        &self.mode
    }

    /// Persist the exchange when running in production. Never fails the caller.
    pub async fn maybe_persist(&self, message: &str, reply: &AgentReply) -> PersistOutcome {
        self.maybe_persist_at(message, reply, Utc::now()).await
    }

    pub(crate) async fn maybe_persist_at(
        &self,
        message: &str,
        reply: &AgentReply,
        now: DateTime<Utc>,
    ) -> PersistOutcome {
        if !self.mode.is_production() {
            debug!(mode = %self.mode.as_str(), "Skipping conversation persistence");
            return PersistOutcome::Skipped;
        }

        let key = conversation_key(now.timestamp_millis());
        let record = ConversationRecord::new(message, reply, now);

        match self.write(&key, &record).await {
            Ok(()) => {
                info!(key = %key, "Stored conversation");
                PersistOutcome::Written { key }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to persist conversation");
                PersistOutcome::Failed
            }
        }
    }

    async fn write(&self, key: &str, record: &ConversationRecord) -> Result<(), StoreError> {
        let json_bytes = serde_json::to_vec(record)?;
        self.store.put(key, &json_bytes).await
    }
}

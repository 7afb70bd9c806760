pub mod agent;
pub mod config;
pub mod conversation;
pub mod retention;

pub use agent::{BuiltinPingPongAgent, ProcessAgentRunner, build_runner};
pub use config::{DeploymentMode, ServerConfig, StorageBackend};
pub use conversation::{ConversationStore, PersistOutcome};
pub use retention::{RetentionSweeper, SweepReport};

use pingpong_storage::{KvStorage, MemoryKvStore};
use pingpong_traits::{AgentRunner, KvStore};
use std::sync::Arc;
use tracing::info;

/// Application state shared by every request handler.
pub struct AppCore {
    pub config: ServerConfig,
    pub store: Arc<dyn KvStore>,
    pub agent: Arc<dyn AgentRunner>,
    pub conversations: ConversationStore,
    pub sweeper: Arc<RetentionSweeper>,
}

impl AppCore {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn KvStore> = match config.storage.backend {
            StorageBackend::Redb => Arc::new(KvStorage::open(&config.storage.path)?),
            StorageBackend::Memory => Arc::new(MemoryKvStore::new()),
        };
        let agent = build_runner(&config.agent);

        info!(
            environment = %config.environment.as_str(),
            agent = %agent.name(),
            storage = ?config.storage.backend,
            "Initializing PingPong agent server"
        );

        Ok(Self::with_parts(config, store, agent))
    }

    /// Assemble from explicit parts, bypassing backend selection.
    pub fn with_parts(
        config: ServerConfig,
        store: Arc<dyn KvStore>,
        agent: Arc<dyn AgentRunner>,
    ) -> Self {
        let conversations = ConversationStore::new(store.clone(), config.environment.clone());
        let sweeper = Arc::new(
            RetentionSweeper::new(store.clone()).with_page_size(config.retention.page_size),
        );

        Self {
            config,
            store,
            agent,
            conversations,
            sweeper,
        }
    }
}

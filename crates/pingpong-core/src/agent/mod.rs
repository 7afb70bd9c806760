pub mod builtin;
pub mod process;

use std::sync::Arc;

use pingpong_traits::AgentRunner;

use crate::config::{AgentConfig, AgentKind};

pub use builtin::BuiltinPingPongAgent;
pub use process::ProcessAgentRunner;

/// Build the configured agent runner.
pub fn build_runner(config: &AgentConfig) -> Arc<dyn AgentRunner> {
    match config.kind {
        AgentKind::Process => Arc::new(ProcessAgentRunner::from_config(config)),
        AgentKind::Builtin => Arc::new(BuiltinPingPongAgent::new()),
    }
}

//! Agent runner abstraction.
//!
//! An agent is an opaque capability: it accepts one message and returns one
//! structured reply. Implementations decide how the computation is hosted
//! (child process, in-process, remote).

use async_trait::async_trait;

use crate::error::AgentError;
use crate::models::AgentReply;

#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Human-readable runner name, used in logs.
    fn name(&self) -> &str;

    /// Run one invocation. Callers validate that `message` is non-empty.
    async fn invoke(&self, message: &str) -> Result<AgentReply, AgentError>;
}

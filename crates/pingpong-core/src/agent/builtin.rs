//! In-process ping-pong agent, for deployments without an agent interpreter.

use async_trait::async_trait;
use pingpong_traits::{AgentError, AgentReply, AgentRunner};

const INVALID_MOVE_REPLY: &str = "Please send 'ping' or 'pong' to play!";

#[derive(Debug, Clone, Default)]
pub struct BuiltinPingPongAgent;

impl BuiltinPingPongAgent {
    pub fn new() -> Self {
        Self
    }

    fn respond(message: &str) -> &'static str {
        match message.trim().to_lowercase().as_str() {
            "ping" => "pong",
            "pong" => "ping",
            _ => INVALID_MOVE_REPLY,
        }
    }
}

#[async_trait]
impl AgentRunner for BuiltinPingPongAgent {
    fn name(&self) -> &str {
        "builtin-ping-pong"
    }

    async fn invoke(&self, message: &str) -> Result<AgentReply, AgentError> {
        Ok(AgentReply::new("assistant", Self::respond(message)))
    }
}

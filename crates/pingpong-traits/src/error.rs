//! Error types shared by agent runners and store backends.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single agent invocation.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The agent process exited with a failure status.
    #[error("Agent process failed: {stderr}")]
    Invocation { status: Option<i32>, stderr: String },

    /// The agent exited cleanly but its output is not a well-formed reply.
    #[error("Failed to parse agent response: {detail}")]
    Protocol { detail: String, raw_output: String },

    #[error("Agent process timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Failed to run agent process: {0}")]
    Spawn(#[from] std::io::Error),
}

impl AgentError {
    pub fn protocol(detail: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Self::Protocol {
            detail: detail.into(),
            raw_output: raw_output.into(),
        }
    }

    /// Short machine-friendly label, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Invocation { .. } => "invocation",
            Self::Protocol { .. } => "protocol",
            Self::Timeout(_) => "timeout",
            Self::Spawn(_) => "spawn",
        }
    }
}

/// Key-value backend failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

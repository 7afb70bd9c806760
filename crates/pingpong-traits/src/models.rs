use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Offset-less ISO-8601 layouts, extended and basic. A trailing `Z` is stripped first.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y%m%dT%H%M%S%.f"];

/// Structured reply produced by one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub role: String,
    pub content: String,
    /// ISO-8601 instant, kept exactly as the agent produced it.
    pub timestamp: String,
}

impl AgentReply {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Parse the raw stdout of an agent process into a reply.
    pub fn from_agent_output(raw: &str) -> Result<Self, AgentError> {
        let reply: AgentReply =
            serde_json::from_str(raw).map_err(|e| AgentError::protocol(e.to_string(), raw))?;
        reply.validate().map_err(|detail| AgentError::protocol(detail, raw))?;
        Ok(reply)
    }

    /// Check the invariants the HTTP contract relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.content.is_empty() {
            return Err("reply content is empty".to_string());
        }
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|_| ())
            .or_else(|e| {
                if is_naive_iso8601(&self.timestamp) {
                    Ok(())
                } else {
                    Err(format!("invalid reply timestamp '{}': {}", self.timestamp, e))
                }
            })
    }
}

/// ISO-8601 forms RFC 3339 rejects: no offset (Python's `isoformat()`), or basic format.
fn is_naive_iso8601(timestamp: &str) -> bool {
    if DateTime::parse_from_str(timestamp, "%Y%m%dT%H%M%S%.f%z").is_ok() {
        return true;
    }
    let naive = timestamp.strip_suffix('Z').unwrap_or(timestamp);
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(naive, format).is_ok())
}

/// Persisted conversation entry, stored under `conversation:<epoch-millis>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub message: String,
    pub response: String,
    pub timestamp: String,
}

impl ConversationRecord {
    pub fn new(message: impl Into<String>, reply: &AgentReply, at: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            response: reply.content.clone(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

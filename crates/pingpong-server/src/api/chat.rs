use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use pingpong_core::PersistOutcome;
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use super::AppState;
use crate::error::{ApiError, with_cors_origin};

pub const AGENT_NAME: &str = "PingPongAgent";
pub const AGENT_VERSION: &str = "0.1.0";

#[derive(Debug, Serialize)]
pub struct AgentStatus {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

// GET /
pub async fn agent_status() -> Response {
    with_cors_origin(
        Json(AgentStatus {
            status: "active",
            name: AGENT_NAME,
            version: AGENT_VERSION,
        })
        .into_response(),
    )
}

// POST /
pub async fn chat(State(core): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let message = extract_message(&body)?;
    let request_id = Uuid::new_v4();

    async move {
        debug!(agent = %core.agent.name(), message_len = message.len(), "Invoking agent");
        let reply = core.agent.invoke(&message).await?;

        let outcome = core.conversations.maybe_persist(&message, &reply).await;
        if let PersistOutcome::Written { key } = outcome {
            debug!(key = %key, "Conversation persisted");
        }

        Ok::<_, ApiError>(with_cors_origin(Json(reply).into_response()))
    }
    .instrument(info_span!("chat", request_id = %request_id))
    .await
}

/// Pull a non-empty string `message` out of a JSON request body.
fn extract_message(body: &[u8]) -> Result<String, ApiError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid request body"))?;

    match payload.get("message").and_then(Value::as_str) {
        Some(message) if !message.is_empty() => Ok(message.to_string()),
        _ => Err(ApiError::message_required()),
    }
}

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use pingpong_traits::AgentError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: Option<String>,
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            message: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Internal Server Error".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn message_required() -> Self {
        Self::bad_request("Message is required")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.message {
            Some(message) => json!({ "error": self.error, "message": message }),
            None => json!({ "error": self.error }),
        };
        with_cors_origin((self.status, Json(body)).into_response())
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        tracing::error!(kind = err.kind(), error = %err, "Agent invocation failed");
        Self::internal(err.to_string())
    }
}

/// Stamp the allow-all origin header on a response.
pub fn with_cors_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

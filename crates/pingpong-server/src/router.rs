use axum::{
    Json, Router,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::api::{AppState, chat};
use crate::error::with_cors_origin;
use crate::middleware;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(chat::agent_status).post(chat::chat))
        .route("/health", get(health_check))
        .layer(middleware::cors::build_cors_layer())
        .with_state(state)
}

async fn health_check() -> Response {
    with_cors_origin(Json(json!({ "status": "ok" })).into_response())
}

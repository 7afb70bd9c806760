use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use pingpong_core::{AppCore, BuiltinPingPongAgent, DeploymentMode, ServerConfig};
use pingpong_server::build_router;
use pingpong_storage::{KvStorage, MemoryKvStore};
use pingpong_traits::{AgentError, AgentReply, AgentRunner, KvStore};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

/// Runner that records how often it was called and replies with a fixed result.
struct ScriptedRunner {
    calls: AtomicUsize,
    fail_with: Option<fn() -> AgentError>,
}

impl ScriptedRunner {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: None,
        })
    }

    fn failing(fail_with: fn() -> AgentError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: Some(fail_with),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, _message: &str) -> Result<AgentReply, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(fail) => Err(fail()),
            None => Ok(AgentReply {
                role: "agent".to_string(),
                content: "pong".to_string(),
                timestamp: "2024-01-01T00:00:00Z".to_string(),
            }),
        }
    }
}

fn app(mode: DeploymentMode, store: Arc<dyn KvStore>, agent: Arc<dyn AgentRunner>) -> Router {
    let config = ServerConfig {
        environment: mode,
        ..ServerConfig::default()
    };
    build_router(Arc::new(AppCore::with_parts(config, store, agent)))
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn assert_json_with_cors(response: &axum::response::Response) {
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_missing_message_returns_400_without_invoking_agent() {
    let runner = ScriptedRunner::ok();
    let store = Arc::new(MemoryKvStore::new());

    for body in [r#"{}"#, r#"{"message":""}"#, r#"{"message":null}"#] {
        let response = app(DeploymentMode::Production, store.clone(), runner.clone())
            .oneshot(post(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_json_with_cors(&response);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Message is required" })
        );
    }

    assert_eq!(runner.calls(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unparsable_body_returns_400() {
    let runner = ScriptedRunner::ok();
    let response = app(
        DeploymentMode::Production,
        Arc::new(MemoryKvStore::new()),
        runner.clone(),
    )
    .oneshot(post("{not json"))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(runner.calls(), 0);
}

#[tokio::test]
async fn test_invocation_error_returns_500() {
    let runner = ScriptedRunner::failing(|| AgentError::Invocation {
        status: Some(1),
        stderr: "ModuleNotFoundError: oflo_agent_protocol".to_string(),
    });
    let store = Arc::new(MemoryKvStore::new());

    let response = app(DeploymentMode::Production, store.clone(), runner.clone())
        .oneshot(post(r#"{"message":"ping"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_json_with_cors(&response);
    assert_eq!(
        body_json(response).await,
        json!({
            "error": "Internal Server Error",
            "message": "Agent process failed: ModuleNotFoundError: oflo_agent_protocol",
        })
    );
    assert_eq!(runner.calls(), 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_protocol_error_returns_500_with_parse_detail() {
    let runner = ScriptedRunner::failing(|| AgentError::protocol("missing field `timestamp`", "{}"));

    let response = app(
        DeploymentMode::Production,
        Arc::new(MemoryKvStore::new()),
        runner,
    )
    .oneshot(post(r#"{"message":"ping"}"#))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal Server Error");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to parse agent response")
    );
}

#[tokio::test]
async fn test_ping_in_production_persists_one_record() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(KvStorage::open(temp_dir.path().join("http.redb")).unwrap());

    let response = app(
        DeploymentMode::Production,
        store.clone(),
        Arc::new(BuiltinPingPongAgent::new()),
    )
    .oneshot(post(r#"{"message":"ping"}"#))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_json_with_cors(&response);
    let body = body_json(response).await;
    assert_eq!(body["role"], "assistant");
    assert_eq!(body["content"], "pong");
    assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());

    let page = store.list_keys("conversation:", None, 10).await.unwrap();
    assert_eq!(page.keys.len(), 1);

    let stored: Value =
        serde_json::from_slice(&store.get(&page.keys[0]).await.unwrap().unwrap()).unwrap();
    assert_eq!(stored["message"], "ping");
    assert_eq!(stored["response"], "pong");
}

#[tokio::test]
async fn test_reply_is_returned_verbatim() {
    let response = app(
        DeploymentMode::default(),
        Arc::new(MemoryKvStore::new()),
        ScriptedRunner::ok(),
    )
    .oneshot(post(r#"{"message":"ping"}"#))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "role": "agent",
            "content": "pong",
            "timestamp": "2024-01-01T00:00:00Z",
        })
    );
}

#[tokio::test]
async fn test_non_production_never_persists() {
    let store = Arc::new(MemoryKvStore::new());

    for mode in ["development", "staging", "Production"] {
        let response = app(
            DeploymentMode::parse(mode),
            store.clone(),
            ScriptedRunner::ok(),
        )
        .oneshot(post(r#"{"message":"ping"}"#))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert!(store.is_empty());
}

#[tokio::test]
async fn test_status_endpoint() {
    let response = app(
        DeploymentMode::default(),
        Arc::new(MemoryKvStore::new()),
        ScriptedRunner::ok(),
    )
    .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_json_with_cors(&response);
    assert_eq!(
        body_json(response).await,
        json!({ "status": "active", "name": "PingPongAgent", "version": "0.1.0" })
    );
}

#[tokio::test]
async fn test_preflight_is_answered_without_invoking_agent() {
    let runner = ScriptedRunner::ok();
    let response = app(
        DeploymentMode::default(),
        Arc::new(MemoryKvStore::new()),
        runner.clone(),
    )
    .oneshot(
        Request::builder()
            .method("OPTIONS")
            .uri("/")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(runner.calls(), 0);
}

#[tokio::test]
async fn test_health_check() {
    let response = app(
        DeploymentMode::default(),
        Arc::new(MemoryKvStore::new()),
        ScriptedRunner::ok(),
    )
    .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_json_with_cors(&response);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[cfg(unix)]
mod process_agent {
    use super::*;
    use pingpong_core::ProcessAgentRunner;
    use std::time::Duration;

    fn sh(script: &str) -> Arc<ProcessAgentRunner> {
        Arc::new(
            ProcessAgentRunner::new("sh", vec!["-c".to_string(), script.to_string()])
                .with_timeout(Duration::from_secs(10)),
        )
    }

    #[tokio::test]
    async fn test_failing_process_returns_500() {
        let store = Arc::new(MemoryKvStore::new());
        let response = app(
            DeploymentMode::Production,
            store.clone(),
            sh("cat >/dev/null; echo boom >&2; exit 2"),
        )
        .oneshot(post(r#"{"message":"ping"}"#))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains("boom"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_process_output_returns_500() {
        let response = app(
            DeploymentMode::Production,
            Arc::new(MemoryKvStore::new()),
            sh("cat >/dev/null; echo hello"),
        )
        .oneshot(post(r#"{"message":"ping"}"#))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Failed to parse agent response")
        );
    }

    #[tokio::test]
    async fn test_offsetless_iso_timestamp_is_accepted() {
        let response = app(
            DeploymentMode::default(),
            Arc::new(MemoryKvStore::new()),
            sh(r#"cat >/dev/null; printf '{"role":"assistant","content":"pong","timestamp":"2024-01-01T00:00:00.123456"}'"#),
        )
        .oneshot(post(r#"{"message":"ping"}"#))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["timestamp"],
            "2024-01-01T00:00:00.123456"
        );
    }

    #[tokio::test]
    async fn test_process_reply_round_trips_through_http() {
        let store = Arc::new(MemoryKvStore::new());
        let response = app(
            DeploymentMode::Production,
            store.clone(),
            sh(r#"read -r msg; printf '{"role":"agent","content":"%s back","timestamp":"2024-01-01T00:00:00Z"}' "$msg""#),
        )
        .oneshot(post(r#"{"message":"ping"}"#))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["content"], "ping back");
        assert_eq!(store.len(), 1);
    }
}

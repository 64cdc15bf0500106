//! HTTP surface: `/ws` for clients, `/health` for probes and
//! `/api/run_code` for one-off runs outside a live session.

use crate::ws;
use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use proctor_application::EventRouter;
use proctor_core::execution::ExecutionResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<EventRouter>,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub sandbox: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub services: ServiceStatus,
}

impl HealthResponse {
    fn new(sandbox: String) -> Self {
        Self {
            status: "ok",
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            services: ServiceStatus { sandbox },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunCodeRequest {
    /// Only logged; the run is not recorded in any session.
    #[serde(default)]
    pub session_id: Option<String>,
    pub code: String,
    pub problem_id: String,
}

/// Either the sandbox result or `{"status": "error", "stderr": ...}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RunCodeResponse {
    Completed(ExecutionResult),
    Failed { status: &'static str, stderr: String },
}

pub fn build_router(router: Arc<EventRouter>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_upgrade_handler))
        .route("/api/run_code", post(run_code_handler))
        .with_state(AppState { router })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let sandbox = state.router.executions().sandbox_status().await;
    Json(HealthResponse::new(sandbox))
}

async fn ws_upgrade_handler(
    upgrade: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| ws::handle_socket(socket, state.router))
}

async fn run_code_handler(
    State(state): State<AppState>,
    Json(request): Json<RunCodeRequest>,
) -> Json<RunCodeResponse> {
    let outcome = state
        .router
        .executions()
        .run_detached(&request.problem_id, &request.code)
        .await;

    match outcome {
        Ok(result) => Json(RunCodeResponse::Completed(result)),
        Err(e) => {
            tracing::warn!(
                "[Http] Run for session {} failed: {}",
                request.session_id.as_deref().unwrap_or("-"),
                e
            );
            Json(RunCodeResponse::Failed {
                status: "error",
                stderr: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use proctor_application::Collaborators;
    use proctor_core::clock::SystemClock;
    use proctor_core::config::CoordinatorConfig;
    use proctor_core::problem::ProblemCatalog;
    use proctor_infrastructure::InMemorySessionRepository;
    use proctor_interaction::{
        ClientSideSpeech, CodeSandbox, InteractionError, OfflineAssistant, PollStatus,
    };
    use tower::ServiceExt;

    /// Accepts everything; its health check cannot connect.
    struct AcceptingSandbox;

    #[async_trait]
    impl CodeSandbox for AcceptingSandbox {
        async fn submit(&self, _source_code: &str) -> Result<String, InteractionError> {
            Ok("token-0".to_string())
        }

        async fn poll(&self, _token: &str) -> Result<PollStatus, InteractionError> {
            Ok(PollStatus::Finished(ExecutionResult {
                stdout: Some("5/5 tests passed".to_string()),
                status: "Accepted".to_string(),
                test_passed: true,
                test_total: 5,
                ..Default::default()
            }))
        }

        async fn health(&self) -> Result<(), InteractionError> {
            Err(InteractionError::Transport {
                message: "connection refused".to_string(),
                timed_out: false,
            })
        }
    }

    fn app() -> Router {
        let router = EventRouter::new(
            &CoordinatorConfig::default(),
            false,
            Collaborators {
                repository: Arc::new(InMemorySessionRepository::new()),
                catalog: Arc::new(ProblemCatalog::builtin()),
                clock: Arc::new(SystemClock),
                assistant: Arc::new(OfflineAssistant::new()),
                sandbox: Arc::new(AcceptingSandbox),
                speech: Arc::new(ClientSideSpeech),
            },
        );
        build_router(router)
    }

    async fn request_json(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("response json");
        (status, json)
    }

    fn run_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/run_code")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn test_health_reports_sandbox_reachability() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request");

        let (status, json) = request_json(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "proctor-server");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        let sandbox = json["services"]["sandbox"].as_str().unwrap();
        assert!(sandbox.starts_with("unreachable:"), "{sandbox}");
    }

    #[tokio::test]
    async fn test_run_code_returns_sandbox_result() {
        let request = run_request(serde_json::json!({
            "session_id": "s-1",
            "code": "function twoSum(nums, target) { return [0, 1]; }",
            "problem_id": "two-sum",
        }));

        let (status, json) = request_json(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "Accepted");
        assert_eq!(json["test_passed"], true);
        assert_eq!(json["test_total"], 5);
    }

    #[tokio::test]
    async fn test_run_code_failure_is_reported_as_stderr() {
        let request = run_request(serde_json::json!({
            "code": "function fizzBuzz() {}",
            "problem_id": "fizz-buzz",
        }));

        let (status, json) = request_json(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "error");
        assert!(json["stderr"].as_str().unwrap().contains("fizz-buzz"));
    }
}

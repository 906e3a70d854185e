use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use comply_client::{fallback_suggestions, ConnectionManager};
use comply_core::config::RetryConfig;
use comply_core::protocol::{
    ActionRequest, CancelRequest, CommandRequest, OperationStatus, ProgressRequest,
    ResponseType, SuggestRequest,
};
use comply_core::{AuthConfig, ClientConfig, ErrorKind};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct MockState {
    protocol_version: Arc<Mutex<String>>,
    authorization: Arc<Mutex<Option<String>>>,
    command_calls: Arc<AtomicU32>,
    flaky_failures_left: Arc<AtomicU32>,
    fail_suggest: Arc<Mutex<bool>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            protocol_version: Arc::new(Mutex::new("2.0".to_owned())),
            authorization: Arc::new(Mutex::new(None)),
            command_calls: Arc::new(AtomicU32::new(0)),
            flaky_failures_left: Arc::new(AtomicU32::new(0)),
            fail_suggest: Arc::new(Mutex::new(false)),
        }
    }
}

async fn spec(State(state): State<MockState>, headers: HeaderMap) -> Json<Value> {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    *state.authorization.lock().expect("authorization lock") = authorization;

    let version = state.protocol_version.lock().expect("version lock").clone();
    Json(json!({
        "appName": "inventory",
        "appVersion": "1.4.2",
        "protocolVersion": version,
        "features": {"progress": true, "workflows": true, "streaming": false}
    }))
}

async fn command(State(state): State<MockState>, Json(request): Json<Value>) -> Response {
    state.command_calls.fetch_add(1, Ordering::SeqCst);
    let command = request["command"].as_str().unwrap_or_default();

    match command {
        "hello" => Json(json!({"type": "text", "content": "Hello, operator"})).into_response(),
        "report" => Json(json!({
            "type": "structured",
            "content": [
                {"type": "text", "content": "Inventory report"},
                {"type": "table", "headers": ["sku", "qty"], "rows": [["A-1", 4]]}
            ],
            "actions": [{"id": "export", "label": "Export", "command": "export report"}],
            "workflow": {"id": "wf-1", "title": "Audit", "currentStep": 1, "totalSteps": 3}
        }))
        .into_response(),
        "hollow" => Json(json!({"type": "structured"})).into_response(),
        "flaky" => {
            let left = state.flaky_failures_left.load(Ordering::SeqCst);
            if left > 0 {
                state.flaky_failures_left.store(left - 1, Ordering::SeqCst);
                (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response()
            } else {
                Json(json!({"type": "text", "content": "recovered"})).into_response()
            }
        }
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "forbidden" => (StatusCode::UNAUTHORIZED, "").into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "message": format!("Unknown command '{command}'"),
                    "code": "E_UNKNOWN_COMMAND",
                    "recoveryActions": [{"id": "help", "label": "Help", "command": "help"}]
                }
            })),
        )
            .into_response(),
    }
}

async fn action(Json(request): Json<Value>) -> Json<Value> {
    Json(json!({
        "type": "text",
        "content": format!(
            "ran {} in {}",
            request["action"].as_str().unwrap_or_default(),
            request["workflowId"].as_str().unwrap_or("none")
        )
    }))
}

async fn suggest(State(state): State<MockState>, Json(request): Json<Value>) -> Response {
    if *state.fail_suggest.lock().expect("suggest lock") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response();
    }
    let input = request["input"].as_str().unwrap_or_default();
    Json(json!({"suggestions": [{"text": format!("{input}atus"), "description": "Status"}]}))
        .into_response()
}

async fn progress(Json(request): Json<Value>) -> Json<Value> {
    match request["operationId"].as_str().unwrap_or_default() {
        "op-overflow" => Json(json!({"operationId": "op-overflow", "progress": 150, "status": "running"})),
        "op-weird" => Json(json!({"operationId": "op-weird", "progress": 10, "status": "stalled"})),
        id => Json(json!({"operationId": id, "progress": 42.5, "status": "running", "message": "copying"})),
    }
}

async fn cancel(Json(request): Json<Value>) -> Json<Value> {
    match request["operationId"].as_str() {
        Some("op-silent") => Json(json!({"success": true, "message": ""})),
        _ => Json(json!({"success": true, "message": "Operation cancelled"})),
    }
}

async fn spawn_mock_server() -> (String, MockState, oneshot::Sender<()>) {
    let state = MockState::default();
    let app = Router::new()
        .route("/console/spec", get(spec))
        .route("/console/command", post(command))
        .route("/console/action", post(action))
        .route("/console/suggest", post(suggest))
        .route("/console/progress", post(progress))
        .route("/console/cancel", post(cancel))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server listener");
    let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("run mock server");
    });
    (address.to_string(), state, shutdown_tx)
}

fn fast_config() -> ClientConfig {
    ClientConfig {
        retry: RetryConfig {
            max_retries: 2,
            network_base_delay_ms: 10,
            server_busy_delay_ms: 10,
        },
        ..ClientConfig::default()
    }
}

async fn connected_manager() -> (ConnectionManager, MockState, oneshot::Sender<()>) {
    let (host, state, shutdown) = spawn_mock_server().await;
    let manager = ConnectionManager::new(fast_config());
    manager.connect(&host, None).await.expect("connect to mock");
    (manager, state, shutdown)
}

#[tokio::test]
async fn test_handshake_records_application_info() {
    let (host, state, _shutdown) = spawn_mock_server().await;
    let manager = ConnectionManager::new(fast_config());

    let connected = manager
        .connect(&host, Some(AuthConfig::bearer("t0ken")))
        .await
        .expect("handshake");

    assert!(connected.connected);
    assert_eq!(connected.app_name.as_deref(), Some("inventory"));
    assert_eq!(connected.app_version.as_deref(), Some("1.4.2"));
    assert!(connected.supports("progress"));
    assert!(!connected.supports("streaming"));
    assert!(manager.is_connected().await);
    assert_eq!(
        state.authorization.lock().unwrap().as_deref(),
        Some("Bearer t0ken")
    );
}

#[tokio::test]
async fn test_no_auth_header_without_credentials() {
    let (host, state, _shutdown) = spawn_mock_server().await;
    let manager = ConnectionManager::new(fast_config());

    manager.connect(&host, Some(AuthConfig::none())).await.unwrap();
    assert_eq!(*state.authorization.lock().unwrap(), None);
}

#[tokio::test]
async fn test_version_mismatch_is_a_protocol_error() {
    let (host, state, _shutdown) = spawn_mock_server().await;
    let manager = ConnectionManager::new(fast_config());

    for version in ["1.0", "2.0.1", "2", ""] {
        *state.protocol_version.lock().unwrap() = version.to_owned();
        let err = manager.connect(&host, None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Protocol), "version {version:?}");
        assert!(!err.should_retry());
        assert!(!err.recoverable());
        assert!(!manager.is_connected().await);
    }
}

#[tokio::test]
async fn test_closed_port_is_a_recoverable_network_error() {
    let manager = ConnectionManager::new(fast_config());

    let err = manager.connect("localhost:1", None).await.unwrap_err();

    assert!(err.is_network());
    assert!(err.recoverable());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    assert!(manager.last_error().await.is_some());
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn test_failed_reconnect_forgets_previous_application() {
    let (host, state, _shutdown) = spawn_mock_server().await;
    let manager = ConnectionManager::new(fast_config());
    manager.connect(&host, None).await.expect("first handshake");

    *state.protocol_version.lock().unwrap() = "1.0".to_owned();
    manager.connect(&host, None).await.unwrap_err();

    let after = manager.state().await;
    assert!(!after.connected);
    assert_eq!(after.host, host);
    assert!(after.app_name.is_none());
    assert!(after.app_version.is_none());
    assert!(after.protocol_version.is_none());
    assert!(after.features.is_empty());
    assert!(after.last_error.is_some());
    assert_eq!(after.stats.requests_sent, 2);
}

#[tokio::test]
async fn test_text_and_structured_commands() {
    let (manager, _state, _shutdown) = connected_manager().await;
    let cancel = CancellationToken::new();

    let text = manager
        .execute_command(&CommandRequest::new("hello"), &cancel)
        .await
        .unwrap();
    assert_eq!(text.response_type, ResponseType::Text);
    assert_eq!(text.payload(), json!("Hello, operator"));

    let report = manager
        .execute_command(&CommandRequest::new("report"), &cancel)
        .await
        .unwrap();
    assert_eq!(report.response_type, ResponseType::Structured);
    assert_eq!(report.actions[0].id, "export");
    assert_eq!(report.workflow.unwrap().total_steps, 3);
    assert!(report.content.unwrap().is_array());
}

#[tokio::test]
async fn test_structured_response_without_content_is_rejected() {
    let (manager, _state, _shutdown) = connected_manager().await;

    let err = manager
        .execute_command(&CommandRequest::new("hollow"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_protocol());
}

#[tokio::test]
async fn test_empty_command_never_reaches_the_server() {
    let (manager, state, _shutdown) = connected_manager().await;

    let err = manager
        .execute_command(&CommandRequest::new(""), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.validation_field(), Some("command"));
    assert_eq!(state.command_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transient_server_errors_are_retried() {
    let (manager, state, _shutdown) = connected_manager().await;
    state.flaky_failures_left.store(2, Ordering::SeqCst);

    let response = manager
        .execute_command(&CommandRequest::new("flaky"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.payload(), json!("recovered"));
    assert_eq!(state.command_calls.load(Ordering::SeqCst), 3);
    assert_eq!(manager.state().await.stats.retries, 2);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let (manager, state, _shutdown) = connected_manager().await;

    let err = manager
        .execute_command(&CommandRequest::new("broken"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Http));
    assert_eq!(state.command_calls.load(Ordering::SeqCst), 3);
    assert_eq!(manager.last_error().await.unwrap().kind(), Some(ErrorKind::Http));
}

#[tokio::test]
async fn test_structured_error_envelope() {
    let (manager, state, _shutdown) = connected_manager().await;

    let err = manager
        .execute_command(&CommandRequest::new("frobnicate"), &CancellationToken::new())
        .await
        .unwrap_err();

    let protocol = err.as_protocol().expect("protocol error");
    assert_eq!(protocol.kind(), ErrorKind::HttpStructured);
    assert_eq!(protocol.message(), "Unknown command 'frobnicate'");
    assert_eq!(protocol.code(), Some("E_UNKNOWN_COMMAND"));
    assert_eq!(err.recovery_actions()[0].command, "help");
    assert_eq!(state.command_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_authentication_failure_is_not_retried() {
    let (manager, state, _shutdown) = connected_manager().await;

    let err = manager
        .execute_command(&CommandRequest::new("forbidden"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_authentication());
    assert_eq!(state.command_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_command() {
    let (manager, _state, _shutdown) = connected_manager().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = manager
        .execute_command(&CommandRequest::new("hello"), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_action_with_workflow() {
    let (manager, _state, _shutdown) = connected_manager().await;

    let response = manager
        .execute_action(
            &ActionRequest::new("approve").in_workflow("wf-7"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(response.payload(), json!("ran approve in wf-7"));

    let err = manager
        .execute_action(
            &ActionRequest::new("approve").in_workflow("wf 7"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.validation_field(), Some("workflowId"));
}

#[tokio::test]
async fn test_suggestions_degrade_to_fallback() {
    let (manager, state, _shutdown) = connected_manager().await;

    let suggestions = manager
        .get_suggestions(&SuggestRequest::new("st"))
        .await
        .unwrap();
    assert_eq!(suggestions[0].text, "status");

    *state.fail_suggest.lock().unwrap() = true;
    let suggestions = manager
        .get_suggestions(&SuggestRequest::new("st"))
        .await
        .unwrap();
    assert_eq!(suggestions, fallback_suggestions());
}

#[tokio::test]
async fn test_progress_validation() {
    let (manager, _state, _shutdown) = connected_manager().await;

    let progress = manager
        .get_progress(&ProgressRequest::new("op-1"))
        .await
        .unwrap();
    assert_eq!(progress.operation_id, "op-1");
    assert_eq!(progress.status, OperationStatus::Running);
    assert_eq!(progress.message.as_deref(), Some("copying"));

    let err = manager
        .get_progress(&ProgressRequest::new("op-overflow"))
        .await
        .unwrap_err();
    assert!(err.is_protocol());

    let err = manager
        .get_progress(&ProgressRequest::new("op-weird"))
        .await
        .unwrap_err();
    assert!(err.is_protocol());
}

#[tokio::test]
async fn test_cancel_requires_message() {
    let (manager, _state, _shutdown) = connected_manager().await;

    let response = manager
        .cancel_operation(&CancelRequest::operation("op-1"))
        .await
        .unwrap();
    assert_eq!(response.message, "Operation cancelled");

    let err = manager
        .cancel_operation(&CancelRequest::operation("op-silent"))
        .await
        .unwrap_err();
    assert!(err.is_protocol());

    let err = manager
        .cancel_operation(&CancelRequest::default())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_disconnect_clears_state() {
    let (manager, _state, _shutdown) = connected_manager().await;
    manager
        .execute_command(&CommandRequest::new("hello"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(manager.state().await.stats.requests_sent >= 2);

    manager.disconnect().await;

    let state = manager.state().await;
    assert!(!state.connected);
    assert!(state.app_name.is_none());
    assert!(state.features.is_empty());

    let err = manager
        .execute_command(&CommandRequest::new("hello"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_connection());
}

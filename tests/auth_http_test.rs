//! Integration tests for the auth client against a scripted HTTP server
//!
//! Tests:
//! - device flow: pending → pending → slow_down → token, exactly 4 polls
//! - access_denied / expired_token / unknown error stop polling
//! - cancellation
//! - session and debug key endpoints: success, 401, 500, malformed payload

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use atomemo::api::{ApiClient, ApiError, USER_AGENT};
use atomemo::auth::{
    AuthError, DeviceFlow, PollSchedule, fetch_debug_api_key, fetch_session,
};

type Reply = (StatusCode, Value);

#[derive(Clone, Default)]
struct Script {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    polls: Arc<AtomicUsize>,
    last_body: Arc<Mutex<Option<Value>>>,
}

impl Script {
    fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            ..Default::default()
        }
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

async fn device_code(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if agent != USER_AGENT || body["client_id"] != "atomemo_plugin_cli" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_client" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "device_code": "dev-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "http://localhost/device",
            "verification_uri_complete": "http://localhost/device?code=ABCD-EFGH",
            "expires_in": 900,
            "interval": 5
        })),
    )
}

async fn device_token(State(script): State<Script>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    script.polls.fetch_add(1, Ordering::SeqCst);
    *script.last_body.lock().unwrap() = Some(body);
    let (status, reply) = script
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((StatusCode::BAD_REQUEST, json!({ "error": "authorization_pending" })));
    (status, Json(reply))
}

async fn session(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer good") => (
            StatusCode::OK,
            Json(json!({
                "user": { "name": "Jane Roe", "email": "jane@example.com" },
                "session": {
                    "updatedAt": "2025-01-19T10:00:00.000Z",
                    "expiresAt": "2025-02-19T10:00:00.000Z"
                }
            })),
        ),
        Some("Bearer broken") => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))),
    }
}

async fn debug_api_key(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer good") => (StatusCode::OK, Json(json!({ "api_key": "dbg_abcdef123456" }))),
        Some("Bearer empty") => (StatusCode::OK, Json(json!({ "other": true }))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({}))),
    }
}

/// Start the scripted server and return its base URL
async fn start_server(script: Script) -> String {
    let app = Router::new()
        .route("/v1/auth/device/code", post(device_code))
        .route("/v1/auth/device/token", post(device_token))
        .route("/v1/auth/get-session", get(session))
        .route("/api/v1/debug_api_key", get(debug_api_key))
        .with_state(script);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base_url
}

fn fast() -> PollSchedule {
    PollSchedule {
        initial: Duration::from_millis(10),
        slow_down_step: Duration::from_millis(10),
    }
}

fn pending() -> Reply {
    (StatusCode::BAD_REQUEST, json!({ "error": "authorization_pending" }))
}

fn flow(base_url: &str) -> DeviceFlow {
    DeviceFlow::new(ApiClient::new().unwrap(), base_url).with_schedule(fast())
}

#[tokio::test]
async fn device_code_request() {
    let base_url = start_server(Script::default()).await;

    let authorization = flow(&base_url).request_device_code().await.unwrap();
    assert_eq!(authorization.device_code, "dev-123");
    assert_eq!(authorization.user_code, "ABCD-EFGH");
    assert_eq!(
        authorization.verification_uri_complete.as_deref(),
        Some("http://localhost/device?code=ABCD-EFGH")
    );
}

#[tokio::test]
async fn device_code_failure_is_fatal() {
    // nothing listens on /nope/v1/auth/device/code
    let base_url = start_server(Script::default()).await;

    let err = flow(&format!("{base_url}/nope"))
        .request_device_code()
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Api(ApiError::Status { .. })));
    assert!(!err.is_benign());
}

#[tokio::test]
async fn polls_until_token_with_slow_down() {
    let script = Script::new([
        pending(),
        pending(),
        (StatusCode::BAD_REQUEST, json!({ "error": "slow_down" })),
        (
            StatusCode::OK,
            json!({ "access_token": "tok-1", "token_type": "Bearer", "expires_in": 3600 }),
        ),
    ]);
    let base_url = start_server(script.clone()).await;

    let grant = flow(&base_url)
        .poll_for_token("dev-123", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(grant.access_token, "tok-1");
    assert_eq!(grant.extra["token_type"], "Bearer");
    assert_eq!(script.polls(), 4);

    let body = script.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["grant_type"], "urn:ietf:params:oauth:grant-type:device_code");
    assert_eq!(body["client_id"], "atomemo_plugin_cli");
    assert_eq!(body["device_code"], "dev-123");
}

#[tokio::test]
async fn access_denied_stops_polling() {
    let script = Script::new([(StatusCode::BAD_REQUEST, json!({ "error": "access_denied" }))]);
    let base_url = start_server(script.clone()).await;

    let err = flow(&base_url)
        .poll_for_token("dev-123", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::AccessDenied));
    assert!(err.is_benign());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(script.polls(), 1);
}

#[tokio::test]
async fn expired_token_stops_polling() {
    let script = Script::new([
        pending(),
        (StatusCode::BAD_REQUEST, json!({ "error": "expired_token" })),
    ]);
    let base_url = start_server(script.clone()).await;

    let err = flow(&base_url)
        .poll_for_token("dev-123", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Expired));
    assert_eq!(script.polls(), 2);
}

#[tokio::test]
async fn unknown_error_carries_description() {
    let script = Script::new([(
        StatusCode::BAD_REQUEST,
        json!({ "error": "invalid_grant", "error_description": "device code is unknown" }),
    )]);
    let base_url = start_server(script).await;

    let err = flow(&base_url)
        .poll_for_token("dev-123", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(&err, AuthError::Server(d) if d == "device code is unknown"));
    assert!(!err.is_benign());
}

#[tokio::test]
async fn cancellation_interrupts_polling() {
    let script = Script::default();
    let base_url = start_server(script.clone()).await;
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(35)).await;
            cancel.cancel();
        })
    };

    let err = flow(&base_url)
        .poll_for_token("dev-123", &cancel)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, AuthError::Cancelled));
    assert!(script.polls() >= 1);
}

#[tokio::test]
async fn fetches_session() {
    let base_url = start_server(Script::default()).await;
    let api = ApiClient::new().unwrap();

    let session = fetch_session(&api, &base_url, "good").await.unwrap();
    assert_eq!(session.user.name, "Jane Roe");
    assert_eq!(session.user.email, "jane@example.com");
    assert_eq!(session.session.expires_at, "2025-02-19T10:00:00.000Z");
}

#[tokio::test]
async fn session_unauthorized() {
    let base_url = start_server(Script::default()).await;
    let api = ApiClient::new().unwrap();

    let err = fetch_session(&api, &base_url, "stale").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(
        err.to_string(),
        "Access token is invalid or expired, please login again"
    );
}

#[tokio::test]
async fn session_server_error() {
    let base_url = start_server(Script::default()).await;
    let api = ApiClient::new().unwrap();

    let err = fetch_session(&api, &base_url, "broken").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { .. }));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn fetches_debug_api_key() {
    let base_url = start_server(Script::default()).await;
    let api = ApiClient::new().unwrap();

    let key = fetch_debug_api_key(&api, &base_url, "good").await.unwrap();
    assert_eq!(key, "dbg_abcdef123456");

    let err = fetch_debug_api_key(&api, &base_url, "empty").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "API response format error: missing api_key field"
    );

    let err = fetch_debug_api_key(&api, &base_url, "nope").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

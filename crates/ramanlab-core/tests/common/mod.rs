//! In-process mock of the lab backend for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ramanlab_core::api::{build_http_client, parse_base_url};
use ramanlab_core::shell::ShellEvent;
use ramanlab_core::storage::{KeyValueStore, MemoryStore};
use ramanlab_core::{RouteTable, SessionContext};

type Reply = (StatusCode, Json<Value>);

#[derive(Default)]
pub struct BackendState {
    /// Authorization header of every request, in arrival order
    pub seen_auth: Mutex<Vec<Option<String>>>,
}

impl BackendState {
    fn record(&self, headers: &HeaderMap) -> Option<String> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen_auth.lock().unwrap().push(auth.clone());
        auth
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        let app = Router::new()
            .route("/api/v1/auth/login/", post(login))
            .route("/api/v1/auth/me/", get(me))
            .route("/api/v1/auth/register/", post(register))
            .route("/api/v1/records/", get(records))
            .route("/api/v1/slow-401/", get(slow_unauthorized))
            .route("/api/v1/late-401/", get(late_unauthorized))
            .route("/api/v1/boom/", get(boom))
            .route("/api/v1/invalid/", get(invalid))
            .route("/api/v1/slow/", get(slow))
            .route("/api/v1/upload/", post(upload))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener.local_addr().expect("resolved local listener address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}/api/v1/"),
            state,
            handle,
        }
    }

    pub fn seen_auth(&self) -> Vec<Option<String>> {
        self.state.seen_auth.lock().unwrap().clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn bearer(auth: Option<&str>) -> Option<&str> {
    auth.and_then(|a| a.strip_prefix("Bearer "))
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
}

async fn login(State(state): State<Arc<BackendState>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    state.record(&headers);
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match (username, password) {
        ("alice", "pw") => (StatusCode::OK, Json(json!({"access": "A1", "refresh": "R1"}))),
        // Tokens the profile endpoint rejects or fails on
        ("bob", "pw") => (StatusCode::OK, Json(json!({"access": "EXPIRED", "refresh": "R2"}))),
        ("carol", "pw") => (StatusCode::OK, Json(json!({"access": "FLAKY", "refresh": "R3"}))),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid credentials"})),
        ),
    }
}

async fn me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Reply {
    let auth = state.record(&headers);
    match bearer(auth.as_deref()) {
        Some("A1") => (
            StatusCode::OK,
            Json(json!({"id": 1, "username": "alice", "email": "alice@lab.org"})),
        ),
        Some("FLAKY") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "profile service down"})),
        ),
        _ => unauthorized(),
    }
}

async fn register(State(state): State<Arc<BackendState>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    state.record(&headers);
    if body["username"] == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"username": ["A user with that username already exists."]})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({"id": 2, "username": body["username"], "email": body["email"]})),
    )
}

async fn records(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Reply {
    let auth = state.record(&headers);
    match bearer(auth.as_deref()) {
        Some("A1") => (StatusCode::OK, Json(json!({"count": 0, "results": []}))),
        _ => unauthorized(),
    }
}

async fn slow_unauthorized(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Reply {
    state.record(&headers);
    tokio::time::sleep(Duration::from_millis(50)).await;
    unauthorized()
}

/// Answers 401 long enough after the request that a new login can land first
async fn late_unauthorized(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Reply {
    state.record(&headers);
    tokio::time::sleep(Duration::from_millis(500)).await;
    unauthorized()
}

async fn boom(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Reply {
    state.record(&headers);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"})))
}

async fn invalid(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Reply {
    state.record(&headers);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"patient_id": ["This field is required."]})),
    )
}

async fn slow(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Reply {
    state.record(&headers);
    tokio::time::sleep(Duration::from_secs(2)).await;
    (StatusCode::OK, Json(json!({})))
}

async fn upload(State(state): State<Arc<BackendState>>, headers: HeaderMap, body: Bytes) -> Reply {
    state.record(&headers);
    let multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    if !multipart || body.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "No file uploaded"})));
    }
    (
        StatusCode::CREATED,
        Json(json!({"id": 5, "diagnosis_result": "Benign"})),
    )
}

/// Build a context against `base_url` with an in-memory store
pub fn context(base_url: &str, kv: Arc<MemoryStore>, timeout: Duration) -> SessionContext {
    let client = build_http_client(timeout).expect("client should build");
    let base = parse_base_url(base_url).expect("valid base url");
    let kv: Arc<dyn KeyValueStore> = kv;
    SessionContext::new(client, base, kv, "/login", RouteTable::default_routes())
}

/// A base URL nothing listens on
pub fn closed_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}/api/v1/")
}

/// Everything currently queued on a shell subscription
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<ShellEvent>) -> Vec<ShellEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

//! Local stand-in for the vision API, shared by the unit tests.

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};

use crate::caption::{API_KEY_HEADER, PROMPT};
use crate::config::Config;

pub const TEST_API_KEY: &str = "test-key";

pub fn test_config(api_base: &str, api_key: Option<&str>) -> Config {
    let api_key = api_key.map(str::to_string);
    let api_base = api_base.to_string();
    Config::from_lookup(|key| match key {
        "GEMINI_API_BASE" => Some(api_base.clone()),
        "GEMINI_API_KEY" => api_key.clone(),
        "IMAGE_DESCRIBER_UPSTREAM_TIMEOUT_SECS" => Some("5".to_string()),
        _ => None,
    })
    .unwrap()
}

pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Request bodies received by a stub, in arrival order.
#[derive(Clone, Default)]
pub struct StubLog {
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl StubLog {
    pub fn hits(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.bodies.lock().unwrap().last().cloned()
    }
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    reply: Value,
    log: StubLog,
}

/// Spawns a stub that validates the request shape and answers with `reply`.
pub async fn spawn_gemini_stub(status: StatusCode, reply: Value) -> (String, StubLog) {
    let log = StubLog::default();
    let state = StubState {
        status,
        reply,
        log: log.clone(),
    };
    let router = Router::new().fallback(gemini_stub).with_state(state);
    (spawn_stub(router).await, log)
}

async fn gemini_stub(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.log.bodies.lock().unwrap().push(body.clone());

    if headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) != Some(TEST_API_KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"}))).into_response();
    }
    if uri.query().is_some() || !uri.path().ends_with(":generateContent") {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "bad path"}))).into_response();
    }
    let has_image = body
        .pointer("/contents/0/parts/0/inlineData/data")
        .and_then(Value::as_str)
        .is_some_and(|data| !data.is_empty());
    let has_prompt = body.pointer("/contents/0/parts/1/text") == Some(&json!(PROMPT));
    if !has_image || !has_prompt {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad body"}))).into_response();
    }

    (state.status, Json(state.reply)).into_response()
}

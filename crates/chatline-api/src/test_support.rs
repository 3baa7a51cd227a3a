use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use chatline_db::Database;

use crate::routes::{DEFAULT_MAX_BODY_BYTES, router};
use crate::state::{AppState, new_state};

pub(crate) fn test_state() -> AppState {
    test_state_with_key(None)
}

pub(crate) fn test_state_with_key(key: Option<&str>) -> AppState {
    let db = Database::open_in_memory().unwrap();
    new_state(db, key.map(str::to_string)).unwrap()
}

/// Send a raw request through the full router.
pub(crate) async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = router(state.clone(), DEFAULT_MAX_BODY_BYTES)
        .oneshot(req)
        .await
        .unwrap();

    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

/// POST a JSON body to `/`.
pub(crate) async fn post(state: &AppState, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, body) = send(state, req).await;
    (status, body)
}

pub(crate) async fn login(state: &AppState, handle: &str, password: &str) -> (StatusCode, Value) {
    post(
        state,
        serde_json::json!({ "action": "login", "handle": handle, "password": password }),
    )
    .await
}

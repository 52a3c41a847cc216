#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};
use todo_api::{config::Config, routes, state::AppState, storage::{MemoryStore, Store}};
use tower::ServiceExt;

pub const SECRET: &str = "Darm";

/// Config for tests: fake DSN (never dialed), fixed secret, rate limiting off
/// unless a test turns it on through `extra`.
pub fn test_config(extra: &[(&str, &str)]) -> Config {
    let extra: Vec<(String, String)> = extra
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Config::from_lookup(move |key| {
        if let Some((_, v)) = extra.iter().find(|(k, _)| k == key) {
            return Some(v.clone());
        }
        match key {
            "DATABASE_URL" => Some("postgres://unused@localhost/todo".to_string()),
            "JWT_SECRET" => Some(SECRET.to_string()),
            "RATE_LIMIT_ENABLED" => Some("false".to_string()),
            _ => None,
        }
    })
    .expect("test config is valid")
}

pub fn state_with<S: Store + 'static>(store: Arc<S>, extra: &[(&str, &str)]) -> AppState {
    AppState::new(test_config(extra), store).expect("state builds")
}

/// The real router on top of a fresh in-memory store.
pub fn app() -> Router {
    routes::create_routes(state_with(Arc::new(MemoryStore::new()), &[]))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let res = app.clone().oneshot(req).await.expect("router is infallible");
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(String::from_utf8_lossy(&bytes).into()))
    };

    TestResponse { status, headers, body }
}

pub fn post_raw(path: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(path).header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::from(body.to_string())).expect("request builds")
}

pub fn post_json(path: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    post_raw(path, &body.to_string(), token)
}

pub fn get(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(path);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

/// Stamps the request with a peer address, the way
/// `into_make_service_with_connect_info` does for a real connection.
pub fn from_peer(mut req: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().expect("valid socket address");
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

/// Registers and logs in, returning the bearer token.
pub async fn sign_up_and_in(app: &Router, email: &str, password: &str) -> String {
    let creds = serde_json::json!({"email": email, "password": password});

    let res = send(app, post_json("/auth/sign-up", &creds, None)).await;
    assert_eq!(res.status, StatusCode::OK, "sign-up failed: {}", res.body);

    let res = send(app, post_json("/auth/sign-in", &creds, None)).await;
    assert_eq!(res.status, StatusCode::OK, "sign-in failed: {}", res.body);

    res.body["token"].as_str().expect("token present").to_string()
}

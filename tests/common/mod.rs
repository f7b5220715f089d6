//! Shared helpers for gateway integration tests

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response},
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use edge_gateway::{
    AppState, build_router, proxy::Forwarder, rate_limit::RateLimiter, routes::RouteTable,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub fn gateway(routes: &[String], threshold: u32, timeout: Duration) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        forwarder: Forwarder::new().expect("client builds"),
        routes: RouteTable::from_specs(routes).expect("valid routes"),
        rate_limiter: Arc::new(RateLimiter::new(threshold, 10)),
        request_timeout: timeout,
    });
    (build_router(Arc::clone(&state)), state)
}

pub fn request(method: &str, uri: &str, client_ip: &str) -> Request<Body> {
    request_with_body(method, uri, client_ip, Body::empty())
}

pub fn request_with_body(method: &str, uri: &str, client_ip: &str, body: Body) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .expect("valid request");
    let addr = SocketAddr::new(client_ip.parse().expect("valid ip"), 40_000);
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("infallible")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

// A local port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

use axum::{
    extract::{ConnectInfo, Request, State},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::metrics::{RATE_LIMITED, REQUEST_LATENCY, REQUEST_TOTAL, ROUTE_MISSES};
use crate::state::AppState;
use crate::timeout::TimeoutGuard;

// Key used when the server runs without connect info (e.g. in-process tests)
const UNKNOWN_CLIENT: &str = "unknown";

fn client_id(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Entry point for every inbound request.
///
/// Rate check, then deadline, then route lookup, then forwarding. Whichever
/// step ends the request produces its only response.
pub async fn dispatch_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();
    let client = client_id(&request);

    // Received -> RateChecked
    if !state.rate_limiter.check_and_record(&client) {
        RATE_LIMITED.inc();
        return GatewayError::RateLimitExceeded.into_response();
    }

    // RateChecked -> TimeoutArmed
    let guard = TimeoutGuard::arm(state.request_timeout);

    // TimeoutArmed -> RouteResolved
    let path = request.uri().path().to_string();
    let Some(route) = state.routes.resolve(&path) else {
        guard.disarm();
        ROUTE_MISSES.inc();
        debug!(%client, %path, "no route matched");
        return GatewayError::RouteNotFound.into_response();
    };

    info!(%client, method = %request.method(), %path, route = route.prefix(), "dispatching");

    // RouteResolved -> Forwarding -> Terminal
    let response = match state.forwarder.forward(request, route, guard).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    response
}

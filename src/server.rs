//! Router assembly and process startup.

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::{Layer, ServiceExt, service_fn};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::config::Args;
use crate::handlers::{dispatch_handler, metrics_handler};
use crate::proxy::Forwarder;
use crate::rate_limit::{RateLimiter, reset_task};
use crate::routes::RouteTable;
use crate::state::AppState;

// Added to every response unless the backend set them
const DEFAULT_HEADERS: [(&str, &str); 8] = [
    ("access-control-allow-origin", "*"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-xss-protection", "0"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
];

/// Gateway router: every request goes through the dispatcher.
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .fallback(dispatch_handler)
        .with_state(state);

    let router = DEFAULT_HEADERS.iter().fold(router, |router, &(name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    });

    router
        .layer(middleware::from_fn(cors_preflight))
        .layer(TraceLayer::new_for_http())
}

fn is_preflight(request: &Request) -> bool {
    request.method() == Method::OPTIONS
        && request.headers().contains_key(header::ORIGIN)
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

// Preflights never reach the dispatcher. The CORS layer only sees them, so
// backend CORS headers on proxied responses are left alone.
async fn cors_preflight(request: Request, next: Next) -> Response {
    if !is_preflight(&request) {
        return next.run(request).await;
    }

    let preflight = CorsLayer::permissive().layer(service_fn(|_: Request| async {
        Ok::<_, Infallible>(StatusCode::NO_CONTENT.into_response())
    }));
    match preflight.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

pub fn build_metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub fn build_state(args: &Args) -> Result<Arc<AppState>> {
    let routes = RouteTable::from_specs(args.routes.as_slice()).context("invalid route table")?;
    let forwarder = Forwarder::new().context("failed to build HTTP client")?;

    Ok(Arc::new(AppState {
        forwarder,
        routes,
        rate_limiter: Arc::new(RateLimiter::new(args.rate_limit, args.idle_windows)),
        request_timeout: args.request_timeout(),
    }))
}

pub async fn start_server(args: Args) -> Result<()> {
    let state = build_state(&args)?;

    // spawn the window reset loop
    tokio::spawn(reset_task(Arc::clone(&state.rate_limiter), args.rate_window()));

    if let Some(port) = args.metrics_port {
        let addr = format!("{}:{}", args.host, port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind metrics listener on {addr}"))?;
        info!("Metrics available on http://{}/metrics", addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, build_metrics_router()).await {
                error!("metrics server error: {}", e);
            }
        });
    }

    let addr = args.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Gateway running on http://{}", addr);
    info!(
        "Rate limit: {} requests per {} seconds",
        args.rate_limit, args.rate_window
    );
    info!("Request timeout: {} ms", args.request_timeout_ms);

    let app = build_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

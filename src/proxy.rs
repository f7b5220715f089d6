use axum::{
    body::{Body, HttpBody},
    extract::Request,
    http::{HeaderMap, header},
    response::Response,
};
use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use std::pin::Pin;
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};
use crate::metrics::{TIMEOUTS, UPSTREAM_ERRORS};
use crate::routes::RouteEntry;
use crate::timeout::TimeoutGuard;

const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

type UpstreamStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

pub fn is_hop_by_hop_header(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(name))
}

// Headers sent to the backend. Host is dropped so the client fills in the
// target authority.
fn request_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| *name != header::HOST && !is_hop_by_hop_header(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn response_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop_header(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Sends accepted requests to their backend and streams the answer back.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new() -> Result<Self> {
        // backend redirects go back to the client untouched
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }

    pub async fn forward(
        &self,
        request: Request,
        route: &RouteEntry,
        guard: TimeoutGuard,
    ) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let url = route.upstream_url(parts.uri.path(), parts.uri.query());

        debug!(method = %parts.method, %url, "forwarding request");

        // An empty stream would still be sent chunked, so send nothing instead
        let body = if body.is_end_stream() {
            reqwest::Body::from(Bytes::new())
        } else {
            reqwest::Body::wrap_stream(body.into_data_stream())
        };

        let outbound = self
            .client
            .request(parts.method.clone(), url.clone())
            .headers(request_headers(&parts.headers))
            .body(body)
            .send();

        // Dropping `outbound` on expiry aborts the backend connection
        let result = tokio::select! {
            biased;
            () = guard.expired() => {
                TIMEOUTS.inc();
                warn!(%url, "backend did not answer before the deadline");
                return Err(GatewayError::Timeout);
            }
            result = outbound => result,
        };

        let upstream = match result {
            Ok(res) => res,
            Err(e) => {
                UPSTREAM_ERRORS.inc();
                warn!(%url, error = %e, "backend unreachable");
                return Err(GatewayError::BackendUnreachable(e.to_string()));
            }
        };

        let status = upstream.status();
        let headers = response_headers(upstream.headers());
        debug!(%url, %status, "backend responded");

        let body = guarded_body(Box::pin(upstream.bytes_stream()), guard);
        let mut response = Response::new(Body::from_stream(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        Ok(response)
    }
}

// Passes backend chunks through until the body ends or the deadline passes.
// The guard lives inside the stream so the timer stays armed while streaming.
fn guarded_body(
    upstream: UpstreamStream,
    guard: TimeoutGuard,
) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
    stream::unfold(Some((upstream, guard)), |state| async move {
        let (mut upstream, guard) = state?;

        tokio::select! {
            biased;
            () = guard.expired() => {
                TIMEOUTS.inc();
                warn!("deadline passed while streaming response body, aborting");
                Some((Err(GatewayError::Timeout), None))
            }
            chunk = upstream.next() => match chunk {
                Some(Ok(bytes)) => Some((Ok(bytes), Some((upstream, guard)))),
                Some(Err(e)) => {
                    UPSTREAM_ERRORS.inc();
                    warn!(error = %e, "backend body failed mid-stream");
                    Some((Err(GatewayError::BackendUnreachable(e.to_string())), None))
                }
                None => {
                    guard.disarm();
                    None
                }
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn hop_by_hop_headers_are_recognized() {
        assert!(is_hop_by_hop_header("connection"));
        assert!(is_hop_by_hop_header("Transfer-Encoding"));
        assert!(!is_hop_by_hop_header("content-type"));
        assert!(!is_hop_by_hop_header("authorization"));
    }

    #[test]
    fn request_headers_drop_host_and_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway.example.com"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert("x-request-id", HeaderValue::from_static("42"));

        let forwarded = request_headers(&headers);

        assert!(forwarded.get(header::HOST).is_none());
        assert!(forwarded.get(header::CONNECTION).is_none());
        assert_eq!(forwarded[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(forwarded["x-request-id"], "42");
    }

    #[test]
    fn response_headers_keep_end_to_end_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let passed = response_headers(&headers);

        assert!(passed.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(passed[header::CONTENT_TYPE], "text/plain");
        assert_eq!(passed.get_all(header::SET_COOKIE).iter().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn guarded_body_aborts_when_deadline_passes() {
        let guard = TimeoutGuard::arm(std::time::Duration::from_secs(1));
        // never yields, like a stalled backend
        let upstream: UpstreamStream = Box::pin(stream::pending());

        let items: Vec<_> = guarded_body(upstream, guard).collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(GatewayError::Timeout)));
    }

    #[tokio::test]
    async fn guarded_body_passes_chunks_through() {
        let guard = TimeoutGuard::arm(std::time::Duration::from_secs(30));
        let upstream: UpstreamStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]));

        let chunks: Vec<Bytes> = guarded_body(upstream, guard)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(chunks, vec![Bytes::from_static(b"hello "), Bytes::from_static(b"world")]);
    }
}

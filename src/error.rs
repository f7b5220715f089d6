use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::Envelope;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Gateway timeout")]
    Timeout,

    #[error("Route not found.")]
    RouteNotFound,

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    // startup only
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidRoute(_) | Self::HttpClient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Message shown to clients. Backend details stay in the logs.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "Rate limit exceeded",
            Self::Timeout => "Gateway timeout",
            Self::RouteNotFound => "Route not found.",
            Self::BackendUnreachable(_) => "Backend unreachable",
            Self::InvalidRoute(_) | Self::HttpClient(_) => "Internal server error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        Envelope::error(self.status_code(), self.client_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(GatewayError::RateLimitExceeded, 429, "Rate limit exceeded")]
    #[case(GatewayError::Timeout, 504, "Gateway timeout")]
    #[case(GatewayError::RouteNotFound, 404, "Route not found.")]
    #[case(GatewayError::BackendUnreachable("connection refused".into()), 502, "Backend unreachable")]
    fn request_errors_map_to_envelope(
        #[case] error: GatewayError,
        #[case] code: u16,
        #[case] message: &str,
    ) {
        assert_eq!(error.status_code().as_u16(), code);
        assert_eq!(error.client_message(), message);
        assert_eq!(error.into_response().status().as_u16(), code);
    }
}

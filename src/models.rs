use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// JSON body of every response the gateway writes itself.
///
/// Proxied responses are passed through untouched and never wrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: u16,
    pub status: EnvelopeStatus,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    pub fn new(code: StatusCode, message: impl Into<String>, data: Value) -> Self {
        // anything 4xx/5xx is an error, the rest is a success
        let status = if code.as_u16() >= 400 {
            EnvelopeStatus::Error
        } else {
            EnvelopeStatus::Success
        };

        Self {
            code: code.as_u16(),
            status,
            message: message.into(),
            data,
        }
    }

    pub fn error(code: StatusCode, message: impl Into<String>) -> Self {
        Self::new(code, message, Value::Null)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let code = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn error_envelope_serializes_with_null_data() {
        let envelope = Envelope::error(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "code": 429,
                "status": "Error",
                "message": "Rate limit exceeded",
                "data": null,
            })
        );
    }

    #[test]
    fn status_follows_code() {
        assert_eq!(
            Envelope::error(StatusCode::BAD_REQUEST, "x").status,
            EnvelopeStatus::Error
        );
        assert_eq!(
            Envelope::new(StatusCode::OK, "ok", json!({"a": 1})).status,
            EnvelopeStatus::Success
        );
        assert_eq!(
            Envelope::new(StatusCode::PERMANENT_REDIRECT, "moved", Value::Null).status,
            EnvelopeStatus::Success
        );
    }

    #[test]
    fn response_status_mirrors_code() {
        let response = Envelope::error(StatusCode::GATEWAY_TIMEOUT, "Gateway timeout").into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
    }
}

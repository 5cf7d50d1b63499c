//! Failure classification shared by the HTTP provider clients.
//!
//! - non-2xx with a structured `{"error": {"message": ..}}` body keeps the
//!   provider's status and message
//! - a request that timed out or never got a response maps to 504
//! - any other transport failure maps to 502

use axum::http::StatusCode;
use serde::Deserialize;

use crate::error::{AssistantError, UpstreamService};

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Classify a transport-level reqwest failure
pub(crate) fn from_transport(service: UpstreamService, err: reqwest::Error) -> AssistantError {
    let status = if err.is_timeout() || err.is_connect() {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::BAD_GATEWAY
    };

    AssistantError::upstream(service, status, err.to_string())
}

/// Classify a non-success HTTP response
pub(crate) async fn from_response(
    service: UpstreamService,
    response: reqwest::Response,
) -> AssistantError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    from_status_and_body(service, status, &body)
}

pub(crate) fn from_status_and_body(
    service: UpstreamService,
    status: reqwest::StatusCode,
    body: &str,
) -> AssistantError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let status =
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            AssistantError::upstream(service, status, envelope.error.message)
        }
        Err(_) => AssistantError::upstream(
            service,
            StatusCode::BAD_GATEWAY,
            format!("unexpected response ({}): {}", status, truncate(body, 512)),
        ),
    }
}

/// A 2xx response whose payload could not be used
pub(crate) fn malformed(service: UpstreamService, detail: impl std::fmt::Display) -> AssistantError {
    AssistantError::upstream(
        service,
        StatusCode::BAD_GATEWAY,
        format!("malformed response: {}", detail),
    )
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

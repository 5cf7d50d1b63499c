//! Request metrics for every route of the HTTP API.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, Response, StatusCode},
    middleware::Next,
};
use metrics::{counter, histogram};
use std::time::Instant;

/// Label used for requests that matched no route, so random URLs cannot
/// grow the series count
const UNMATCHED: &str = "unmatched";

/// Record `http_requests_total`, `http_request_duration_seconds` and
/// `http_requests_errors_total` (5xx only) per route template.
///
/// ```rust,ignore
/// let app = router.layer(axum::middleware::from_fn(observability::metrics_middleware));
/// ```
pub async fn metrics_middleware(
    matched_path: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let start = Instant::now();
    let method = request.method().as_str().to_owned();
    let route = matched_path
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED.to_owned());

    let response = next.run(request).await;
    let status = response.status();

    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status_class" => status_class(status)
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method.clone(),
        "route" => route.clone()
    )
    .record(start.elapsed().as_secs_f64());

    if status.is_server_error() {
        counter!(
            "http_requests_errors_total",
            "method" => method,
            "route" => route,
            "status" => status.as_u16().to_string()
        )
        .increment(1);
    }

    response
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

use axum::{Json, Router, http::StatusCode, routing::get};
use core_config::AppInfo;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::pin::Pin;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

/// A boxed readiness probe with a string error
pub type HealthCheckFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Liveness endpoint at `/health`; never touches dependencies
pub fn health_router(info: AppInfo) -> Router {
    Router::new().route(
        "/health",
        get(move || async move {
            Json(HealthResponse {
                status: "healthy",
                name: info.name,
                version: info.version,
            })
        }),
    )
}

/// Run readiness probes concurrently.
///
/// Answers 200 with every probe `connected`, otherwise 503 naming the
/// probes that failed.
pub async fn run_health_checks(
    checks: Vec<(&str, HealthCheckFuture<'_>)>,
) -> (StatusCode, Json<Value>) {
    let names: Vec<_> = checks.iter().map(|(name, _)| *name).collect();
    let results = join_all(checks.into_iter().map(|(_, check)| check)).await;

    let mut services = Map::new();
    let mut all_ready = true;

    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(()) => {
                services.insert(name.to_string(), json!("connected"));
            }
            Err(error) => {
                tracing::error!(check = name, error = %error, "Readiness check failed");
                services.insert(name.to_string(), json!("disconnected"));
                all_ready = false;
            }
        }
    }

    let status = if all_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if all_ready { "ready" } else { "not ready" },
            "services": services,
        })),
    )
}

//! Observability utilities for the merchant assistant service.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Pipeline metrics for the conversation flow
//! - Axum middleware for automatic request metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, AssistantMetrics};
//!
//! init_metrics()?;
//! AssistantMetrics::record_retrieval_degraded("vector_index");
//!
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

pub mod assistant;
pub mod middleware;

pub use assistant::{AssistantMetrics, StageTimer};
pub use middleware::metrics_middleware;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Later calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_histogram};

    // HTTP metrics
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "HTTP responses with a 5xx status"
    );

    // Pipeline metrics
    describe_counter!(
        "assistant_stage_total",
        "Pipeline stage executions by stage and outcome"
    );
    describe_histogram!(
        "assistant_stage_duration_seconds",
        "Pipeline stage duration in seconds"
    );
    describe_counter!(
        "assistant_retrieval_degraded_total",
        "Turns answered without prior context because retrieval failed"
    );
    describe_histogram!(
        "assistant_context_pairs",
        "Prior turns rendered into each prompt"
    );
    describe_counter!(
        "assistant_embedding_upsert_failures_total",
        "Embeddings of persisted turns that were not stored, by kind"
    );
    describe_counter!(
        "assistant_interactions_total",
        "Create-interaction requests by outcome"
    );
    describe_histogram!(
        "assistant_interaction_duration_seconds",
        "End-to-end create-interaction duration in seconds"
    );
}

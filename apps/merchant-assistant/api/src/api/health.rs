use axum::{extract::State, response::IntoResponse};
use axum_helpers::{HealthCheckFuture, run_health_checks};

use crate::state::AppState;

/// Ready once PostgreSQL answers a ping and the vector collection exists
pub async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![
        (
            "database",
            Box::pin(async {
                database::check_health(&state.db)
                    .await
                    .map_err(|e| e.to_string())
            }),
        ),
        (
            "vector_index",
            Box::pin(async {
                if state.index.is_ready().await {
                    Ok(())
                } else {
                    Err(format!("{} index is not ready", state.index.name()))
                }
            }),
        ),
    ];

    run_health_checks(checks).await
}

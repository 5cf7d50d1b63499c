use axum::{middleware, routing::get};
use axum_helpers::{create_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_merchant_assistant::{completion, embedding, index};
use observability::{init_metrics, metrics_handler, metrics_middleware};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);
    init_metrics()?;

    info!(
        name = config.app.name,
        version = config.app.version,
        "Starting merchant assistant"
    );

    let db = database::connect_with_retry(&config.database)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;
    database::run_migrations::<migration::Migrator>(&db, config.app.name).await?;

    let embedder = embedding::from_env(config.providers.embedding)?;
    let completer = completion::from_env(config.providers.completion)?;

    if embedder.dimension() != config.index.qdrant.dimension {
        eyre::bail!(
            "{} embeddings have {} dimensions but the index expects {}",
            embedder.name(),
            embedder.dimension(),
            config.index.qdrant.dimension
        );
    }

    // Initialize the index before accepting traffic
    let index = index::from_config(config.index.clone())?;
    index.ensure_ready().await?;
    info!(
        index = index.name(),
        embedding = embedder.name(),
        completion = completer.name(),
        "Assistant collaborators ready"
    );

    let state = AppState { db, index };

    let api_routes = api::routes(&state, &config, embedder, completer);
    let router = create_router::<openapi::ApiDoc>(api_routes)?;

    let app = router
        .merge(health_router(config.app.clone()))
        .merge(api::ready_router(state.clone()))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(metrics_middleware));

    create_app(app, &config.server).await?;

    info!("Shutting down: closing database connections");
    if let Err(e) = state.db.close().await {
        tracing::error!("Error closing PostgreSQL: {}", e);
    }

    info!("Merchant assistant shutdown complete");
    Ok(())
}

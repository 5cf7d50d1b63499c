use axum::{Router, routing::get};
use std::sync::Arc;

use domain_merchant_assistant::{
    InteractionService, MerchantAssistant, PgConversationRepository, handlers,
};

use crate::config::Config;
use crate::state::AppState;

pub mod health;

/// API routes without the `/api` prefix; `create_router` adds it
pub fn routes(
    state: &AppState,
    config: &Config,
    embedder: Arc<dyn domain_merchant_assistant::EmbeddingProvider>,
    completer: Arc<dyn domain_merchant_assistant::CompletionProvider>,
) -> Router {
    let repository = Arc::new(PgConversationRepository::new(state.db.clone()));

    let assistant = MerchantAssistant::new(
        Arc::clone(&repository),
        embedder,
        completer,
        Arc::clone(&state.index),
        config.assistant.clone(),
    );
    let service = InteractionService::new(repository);

    Router::new().nest("/merchant-assistant", handlers::router(assistant, service))
}

/// `/ready` with real dependency checks
pub fn ready_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

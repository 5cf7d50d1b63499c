use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{UuidPath, ValidatedJson, ValidatedQuery};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::assistant::MerchantAssistant;
use crate::error::AssistantResult;
use crate::models::{CreateInteraction, Interaction, InteractionFilter, MerchantProfile, UpdateInteraction};
use crate::repository::ConversationRepository;
use crate::service::InteractionService;

const TAG: &str = "merchant-assistant";

/// Error body shared by every endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// HTTP status code
    pub code: u16,
}

/// OpenAPI documentation for the Merchant Assistant API
#[derive(OpenApi)]
#[openapi(
    paths(
        create_interaction,
        list_interactions,
        get_interaction,
        update_interaction,
        delete_interaction,
    ),
    components(schemas(
        Interaction,
        CreateInteraction,
        UpdateInteraction,
        InteractionFilter,
        MerchantProfile,
        ErrorResponse
    )),
    tags(
        (name = TAG, description = "Merchant assistant conversations")
    )
)]
pub struct ApiDoc;

/// Shared handler state
pub struct AssistantState<R: ConversationRepository> {
    pub assistant: MerchantAssistant<R>,
    pub service: InteractionService<R>,
}

/// Create the merchant assistant router
pub fn router<R: ConversationRepository + 'static>(
    assistant: MerchantAssistant<R>,
    service: InteractionService<R>,
) -> Router {
    let state = Arc::new(AssistantState { assistant, service });

    Router::new()
        .route(
            "/interactions",
            get(list_interactions).post(create_interaction),
        )
        .route(
            "/interactions/{id}",
            get(get_interaction)
                .put(update_interaction)
                .delete(delete_interaction),
        )
        .with_state(state)
}

/// Ask the assistant a question
///
/// Runs the full pipeline: embed, retrieve prior turns, complete, persist.
#[utoipa::path(
    post,
    path = "/interactions",
    tag = TAG,
    request_body = CreateInteraction,
    responses(
        (status = 201, description = "Turn answered and stored", body = Interaction),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 502, description = "Provider rejected the request", body = ErrorResponse),
        (status = 504, description = "Provider unreachable or timed out", body = ErrorResponse),
        (status = 500, description = "Conversation store failure", body = ErrorResponse)
    )
)]
async fn create_interaction<R: ConversationRepository + 'static>(
    State(state): State<Arc<AssistantState<R>>>,
    ValidatedJson(input): ValidatedJson<CreateInteraction>,
) -> AssistantResult<impl IntoResponse> {
    let interaction = state.assistant.create_interaction(input).await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

/// List turns newest first
#[utoipa::path(
    get,
    path = "/interactions",
    tag = TAG,
    params(InteractionFilter),
    responses(
        (status = 200, description = "Stored turns", body = Vec<Interaction>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
        (status = 500, description = "Conversation store failure", body = ErrorResponse)
    )
)]
async fn list_interactions<R: ConversationRepository + 'static>(
    State(state): State<Arc<AssistantState<R>>>,
    ValidatedQuery(filter): ValidatedQuery<InteractionFilter>,
) -> AssistantResult<Json<Vec<Interaction>>> {
    let interactions = state.service.list_interactions(filter).await?;
    Ok(Json(interactions))
}

/// Get a turn by ID
#[utoipa::path(
    get,
    path = "/interactions/{id}",
    tag = TAG,
    params(("id" = Uuid, Path, description = "Interaction ID")),
    responses(
        (status = 200, description = "Turn found", body = Interaction),
        (status = 400, description = "Invalid UUID", body = ErrorResponse),
        (status = 404, description = "Turn not found", body = ErrorResponse)
    )
)]
async fn get_interaction<R: ConversationRepository + 'static>(
    State(state): State<Arc<AssistantState<R>>>,
    UuidPath(id): UuidPath,
) -> AssistantResult<Json<Interaction>> {
    let interaction = state.service.get_interaction(id).await?;
    Ok(Json(interaction))
}

/// Edit a turn's text; stored embeddings are left as they are
#[utoipa::path(
    put,
    path = "/interactions/{id}",
    tag = TAG,
    params(("id" = Uuid, Path, description = "Interaction ID")),
    request_body = UpdateInteraction,
    responses(
        (status = 200, description = "Turn updated", body = Interaction),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Turn not found", body = ErrorResponse)
    )
)]
async fn update_interaction<R: ConversationRepository + 'static>(
    State(state): State<Arc<AssistantState<R>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateInteraction>,
) -> AssistantResult<Json<Interaction>> {
    let interaction = state.service.update_interaction(id, input).await?;
    Ok(Json(interaction))
}

/// Delete a turn
#[utoipa::path(
    delete,
    path = "/interactions/{id}",
    tag = TAG,
    params(("id" = Uuid, Path, description = "Interaction ID")),
    responses(
        (status = 204, description = "Turn deleted"),
        (status = 404, description = "Turn not found", body = ErrorResponse)
    )
)]
async fn delete_interaction<R: ConversationRepository + 'static>(
    State(state): State<Arc<AssistantState<R>>>,
    UuidPath(id): UuidPath,
) -> AssistantResult<StatusCode> {
    state.service.delete_interaction(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

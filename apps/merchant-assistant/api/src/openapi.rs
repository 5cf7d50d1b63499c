use utoipa::OpenApi;

/// Top-level API documentation; every path is served under `/api`
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Merchant Assistant API",
        description = "Retrieval-augmented business advice for merchants"
    ),
    servers((url = "/api")),
    nest(
        (path = "/merchant-assistant", api = domain_merchant_assistant::ApiDoc)
    )
)]
pub struct ApiDoc;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode, header},
};
use core_config::server::ServerConfig;
use serde_json::{Value, json};
use std::io;
use std::time::Duration;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// The workspace error body: `{"error": message, "code": status}`
pub fn error_body(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "error": message.into(),
            "code": status.as_u16(),
        })),
    )
}

async fn not_found() -> (StatusCode, Json<Value>) {
    error_body(StatusCode::NOT_FOUND, "Resource not found")
}

/// Assemble the public router around already-stated API routes.
///
/// - API routes nested under `/api`
/// - Swagger UI at `/docs`, OpenAPI document at `/api-docs/openapi.json`
/// - request tracing, compression, JSON 404 fallback
/// - CORS from `CORS_ALLOWED_ORIGIN` (comma separated) when set
pub fn create_router<T>(apis: Router) -> io::Result<Router>
where
    T: OpenApi + 'static,
{
    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", T::openapi()))
        .nest("/api", apis)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new());

    if let Some(cors) = cors_from_env()? {
        router = router.layer(cors);
    }

    Ok(router)
}

fn cors_from_env() -> io::Result<Option<CorsLayer>> {
    let Some(origins) = core_config::env_optional("CORS_ALLOWED_ORIGIN") else {
        return Ok(None);
    };

    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<HeaderValue>())
        .collect::<Result<_, _>>()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid CORS_ALLOWED_ORIGIN value: {}", e),
            )
        })?;

    info!(origins = %origins, "CORS configured");

    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
            .max_age(Duration::from_secs(3600)),
    ))
}

/// Bind and serve until SIGINT or SIGTERM, letting in-flight requests finish
pub async fn create_app(router: Router, server_config: &ServerConfig) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;

    info!("Server starting on {}", listener.local_addr()?);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| {
            tracing::error!("Server encountered an error: {:?}", e);
        })
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal, shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM signal, shutting down gracefully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[derive(OpenApi)]
    #[openapi()]
    struct EmptyDoc;

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let router = temp_env::async_with_vars(
            [("CORS_ALLOWED_ORIGIN", None::<&str>)],
            async { create_router::<EmptyDoc>(Router::new().route("/ping", get(|| async { "pong" }))) },
        )
        .await
        .unwrap();

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 404);

        let response = router
            .oneshot(Request::builder().uri("/api/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_invalid_cors_origin_rejected() {
        temp_env::with_var("CORS_ALLOWED_ORIGIN", Some("http://ok.example,\u{7f}bad"), || {
            assert!(cors_from_env().is_err());
        });
    }
}

//! Provider clients against a local fake HTTP server

use std::time::Duration;

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use domain_merchant_assistant::completion::{
    GeminiCompletionConfig, GeminiCompletionProvider, OpenAICompletionConfig,
    OpenAICompletionProvider,
};
use domain_merchant_assistant::embedding::{
    GeminiEmbeddingConfig, GeminiEmbeddingProvider, OpenAIEmbeddingConfig,
    OpenAIEmbeddingProvider,
};
use domain_merchant_assistant::{
    AssistantError, CompletionProvider, EmbeddingProvider, UpstreamService,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// An address nothing listens on
async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn upstream_status(err: &AssistantError) -> StatusCode {
    match err {
        AssistantError::Upstream { status, .. } => *status,
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gemini_completion_success() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(|Path(action): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(action, "gemini-1.5-flash:generateContent");
            assert_eq!(headers["x-goog-api-key"], "test-key");
            assert_eq!(body["generationConfig"]["maxOutputTokens"], 500);
            assert_eq!(body["contents"][0]["role"], "user");

            Json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Run a "}, {"text": "promotion."}]}
                }]
            }))
        }),
    );
    let base = serve(router).await;

    let provider =
        GeminiCompletionProvider::new(GeminiCompletionConfig::new("test-key").with_base_url(format!("{base}/v1beta")))
            .unwrap();

    let text = provider.complete("How do I grow?", 500).await.unwrap();
    assert_eq!(text, "Run a promotion.");
}

#[tokio::test]
async fn test_gemini_structured_error_keeps_status_and_message() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
                })),
            )
        }),
    );
    let base = serve(router).await;

    let provider =
        GeminiCompletionProvider::new(GeminiCompletionConfig::new("k").with_base_url(format!("{base}/v1beta")))
            .unwrap();

    let err = provider.complete("prompt", 10).await.unwrap_err();
    match err {
        AssistantError::Upstream {
            service,
            status,
            message,
        } => {
            assert_eq!(service, UpstreamService::Completion);
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(message, "Quota exceeded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_gemini_blocked_prompt_is_bad_gateway() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(|| async { Json(json!({"promptFeedback": {"blockReason": "SAFETY"}})) }),
    );
    let base = serve(router).await;

    let provider =
        GeminiCompletionProvider::new(GeminiCompletionConfig::new("k").with_base_url(format!("{base}/v1beta")))
            .unwrap();

    let err = provider.complete("prompt", 10).await.unwrap_err();
    assert_eq!(upstream_status(&err), StatusCode::BAD_GATEWAY);
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn test_unreachable_provider_is_gateway_timeout() {
    let provider =
        OpenAICompletionProvider::new(OpenAICompletionConfig::new("k").with_base_url(closed_port().await))
            .unwrap();

    let err = provider.complete("prompt", 10).await.unwrap_err();
    assert_eq!(upstream_status(&err), StatusCode::GATEWAY_TIMEOUT);
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_slow_provider_is_gateway_timeout() {
    let router = Router::new().route(
        "/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"choices": []}))
        }),
    );
    let base = serve(router).await;

    let provider = OpenAICompletionProvider::new(
        OpenAICompletionConfig::new("k")
            .with_base_url(base)
            .with_timeout(Duration::from_millis(100)),
    )
    .unwrap();

    let err = provider.complete("prompt", 10).await.unwrap_err();
    assert_eq!(upstream_status(&err), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_openai_completion_success_and_empty_choice() {
    let router = Router::new().route(
        "/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers["authorization"], "Bearer sk-test");
            assert_eq!(body["max_tokens"], 500);

            if body["messages"][0]["content"] == "empty please" {
                return Json(json!({"choices": [{"message": {"content": null}}]}));
            }
            Json(json!({"choices": [{"message": {"role": "assistant", "content": "  Raise prices 3%.  "}}]}))
        }),
    );
    let base = serve(router).await;

    let provider =
        OpenAICompletionProvider::new(OpenAICompletionConfig::new("sk-test").with_base_url(base))
            .unwrap();

    assert_eq!(
        provider.complete("pricing?", 500).await.unwrap(),
        "Raise prices 3%."
    );

    let err = provider.complete("empty please", 500).await.unwrap_err();
    assert_eq!(upstream_status(&err), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_unstructured_error_body_is_bad_gateway() {
    let router = Router::new().route(
        "/chat/completions",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "<html>overloaded</html>").into_response() }),
    );
    let base = serve(router).await;

    let provider =
        OpenAICompletionProvider::new(OpenAICompletionConfig::new("k").with_base_url(base))
            .unwrap();

    let err = provider.complete("prompt", 10).await.unwrap_err();
    assert_eq!(upstream_status(&err), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_gemini_embedding_success() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(|Path(action): Path<String>, Json(body): Json<Value>| async move {
            assert_eq!(action, "text-embedding-004:embedContent");
            assert_eq!(body["outputDimensionality"], 3);
            Json(json!({"embedding": {"values": [0.1, 0.2, 0.3]}}))
        }),
    );
    let base = serve(router).await;

    let provider = GeminiEmbeddingProvider::new(
        GeminiEmbeddingConfig::new("k")
            .with_base_url(format!("{base}/v1beta"))
            .with_dimension(3),
    )
    .unwrap();

    assert_eq!(provider.embed("hello").await.unwrap(), vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn test_openai_embedding_wrong_dimension_is_rejected() {
    let router = Router::new().route(
        "/embeddings",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["dimensions"], 4);
            Json(json!({"data": [{"embedding": [0.5, 0.5]}]}))
        }),
    );
    let base = serve(router).await;

    let mut config = OpenAIEmbeddingConfig::new("k").with_base_url(base);
    config.dimension = 4;
    let provider = OpenAIEmbeddingProvider::new(config).unwrap();

    let err = provider.embed("hello").await.unwrap_err();
    match err {
        AssistantError::Upstream {
            service, status, ..
        } => {
            assert_eq!(service, UpstreamService::Embedding);
            assert_eq!(status, StatusCode::BAD_GATEWAY);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

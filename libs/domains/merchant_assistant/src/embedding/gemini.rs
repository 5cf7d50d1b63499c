use std::time::Duration;

use async_trait::async_trait;
use core_config::{env_duration_secs, env_or_default, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EmbeddingProvider, check_vector, ensure_embeddable};
use crate::config::embedding_dimension_from_env;
use crate::error::{AssistantError, AssistantResult, UpstreamService};
use crate::upstream;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini embedding configuration
#[derive(Debug, Clone)]
pub struct GeminiEmbeddingConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model name without the `models/` prefix, e.g. `text-embedding-004`
    pub model: String,
    pub dimension: u32,
    pub timeout: Duration,
}

impl GeminiEmbeddingConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "text-embedding-004".to_string(),
            dimension: 768,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dimension(mut self, dimension: u32) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn from_env() -> AssistantResult<Self> {
        Ok(Self {
            api_key: env_required("GEMINI_API_KEY")?,
            base_url: env_or_default("GEMINI_BASE_URL", DEFAULT_BASE_URL),
            model: env_or_default("GEMINI_EMBEDDING_MODEL", "text-embedding-004"),
            dimension: embedding_dimension_from_env()?,
            timeout: env_duration_secs("ASSISTANT_EMBEDDING_TIMEOUT_SECS", 10)?,
        })
    }
}

/// Gemini `embedContent` provider
pub struct GeminiEmbeddingProvider {
    client: Client,
    config: GeminiEmbeddingConfig,
}

impl GeminiEmbeddingProvider {
    pub fn new(config: GeminiEmbeddingConfig) -> AssistantResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AssistantError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> AssistantResult<Self> {
        Self::new(GeminiEmbeddingConfig::from_env()?)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:embedContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    output_dimensionality: u32,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn dimension(&self) -> u32 {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> AssistantResult<Vec<f32>> {
        ensure_embeddable(text)?;

        let request = EmbedContentRequest {
            model: format!("models/{}", self.config.model),
            content: Content {
                parts: [Part { text }],
            },
            output_dimensionality: self.config.dimension,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| upstream::from_transport(UpstreamService::Embedding, e))?;

        if !response.status().is_success() {
            return Err(upstream::from_response(UpstreamService::Embedding, response).await);
        }

        let body: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| upstream::malformed(UpstreamService::Embedding, e))?;

        check_vector(body.embedding.values, self.config.dimension)
    }
}

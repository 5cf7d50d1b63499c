use std::time::Duration;

use async_trait::async_trait;
use core_config::{env_duration_secs, env_or_default, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EmbeddingProvider, check_vector, ensure_embeddable};
use crate::config::embedding_dimension_from_env;
use crate::error::{AssistantError, AssistantResult, UpstreamService};
use crate::upstream;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI embedding configuration
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Requested via the `dimensions` parameter so the index size stays fixed
    pub dimension: u32,
    pub timeout: Duration,
}

impl OpenAIEmbeddingConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "text-embedding-3-small".to_string(),
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

    pub fn from_env() -> AssistantResult<Self> {
        Ok(Self {
            api_key: env_required("OPENAI_API_KEY")?,
            base_url: env_or_default("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            model: env_or_default("OPENAI_EMBEDDING_MODEL", "text-embedding-3-small"),
            dimension: embedding_dimension_from_env()?,
            timeout: env_duration_secs("ASSISTANT_EMBEDDING_TIMEOUT_SECS", 10)?,
        })
    }
}

/// OpenAI `/embeddings` provider
pub struct OpenAIEmbeddingProvider {
    client: Client,
    config: OpenAIEmbeddingConfig,
}

impl OpenAIEmbeddingProvider {
    pub fn new(config: OpenAIEmbeddingConfig) -> AssistantResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AssistantError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> AssistantResult<Self> {
        Self::new(OpenAIEmbeddingConfig::from_env()?)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> u32 {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> AssistantResult<Vec<f32>> {
        ensure_embeddable(text)?;

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
            dimensions: self.config.dimension,
        };

        let response = self
            .client
            .post(format!(
                "{}/embeddings",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| upstream::from_transport(UpstreamService::Embedding, e))?;

        if !response.status().is_success() {
            return Err(upstream::from_response(UpstreamService::Embedding, response).await);
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| upstream::malformed(UpstreamService::Embedding, e))?;

        let values = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .unwrap_or_default();

        check_vector(values, self.config.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_dimensions() {
        let request = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: "hello",
            dimensions: 768,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"], "hello");
        assert_eq!(json["dimensions"], 768);
    }

    #[test]
    fn test_response_parsing_ignores_usage() {
        let raw = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,0.25]}],"usage":{"prompt_tokens":1,"total_tokens":1}}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.5, 0.25]);
    }
}

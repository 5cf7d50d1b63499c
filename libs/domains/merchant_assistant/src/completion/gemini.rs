use std::time::Duration;

use async_trait::async_trait;
use core_config::{env_duration_secs, env_or_default, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, ensure_prompt, non_empty_text};
use crate::error::{AssistantError, AssistantResult, UpstreamService};
use crate::upstream;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini text generation configuration
#[derive(Debug, Clone)]
pub struct GeminiCompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiCompletionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout: Duration::from_secs(30),
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
            api_key: env_required("GEMINI_API_KEY")?,
            base_url: env_or_default("GEMINI_BASE_URL", DEFAULT_BASE_URL),
            model: env_or_default("GEMINI_COMPLETION_MODEL", "gemini-1.5-flash"),
            timeout: env_duration_secs("ASSISTANT_COMPLETION_TIMEOUT_SECS", 30)?,
        })
    }
}

/// Gemini `generateContent` provider
pub struct GeminiCompletionProvider {
    client: Client,
    config: GeminiCompletionConfig,
}

impl GeminiCompletionProvider {
    pub fn new(config: GeminiCompletionConfig) -> AssistantResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AssistantError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> AssistantResult<Self> {
        Self::new(GeminiCompletionConfig::from_env()?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> AssistantResult<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(upstream::malformed(
                UpstreamService::Completion,
                format!("prompt blocked: {reason}"),
            ));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        non_empty_text(text)
    }
}

#[async_trait]
impl CompletionProvider for GeminiCompletionProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> AssistantResult<String> {
        ensure_prompt(prompt, max_tokens)?;

        let request = GenerateContentRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.config.base_url.trim_end_matches('/'),
                self.config.model
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| upstream::from_transport(UpstreamService::Completion, e))?;

        if !response.status().is_success() {
            return Err(upstream::from_response(UpstreamService::Completion, response).await);
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| upstream::malformed(UpstreamService::Completion, e))?;

        body.into_text()
    }
}

use std::time::Duration;

use async_trait::async_trait;
use core_config::{env_duration_secs, env_or_default, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, ensure_prompt, non_empty_text};
use crate::error::{AssistantError, AssistantResult, UpstreamService};
use crate::upstream;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat completion configuration
#[derive(Debug, Clone)]
pub struct OpenAICompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl OpenAICompletionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
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
            api_key: env_required("OPENAI_API_KEY")?,
            base_url: env_or_default("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            model: env_or_default("OPENAI_COMPLETION_MODEL", "gpt-4o-mini"),
            timeout: env_duration_secs("ASSISTANT_COMPLETION_TIMEOUT_SECS", 30)?,
        })
    }
}

/// OpenAI `/chat/completions` provider
pub struct OpenAICompletionProvider {
    client: Client,
    config: OpenAICompletionConfig,
}

impl OpenAICompletionProvider {
    pub fn new(config: OpenAICompletionConfig) -> AssistantResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AssistantError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> AssistantResult<Self> {
        Self::new(OpenAICompletionConfig::from_env()?)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> AssistantResult<String> {
        ensure_prompt(prompt, max_tokens)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| upstream::from_transport(UpstreamService::Completion, e))?;

        if !response.status().is_success() {
            return Err(upstream::from_response(UpstreamService::Completion, response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| upstream::malformed(UpstreamService::Completion, e))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        non_empty_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: 500,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 500);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_null_content_parses() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":null},"finish_reason":"length"}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}

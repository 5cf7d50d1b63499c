use async_trait::async_trait;

use crate::error::AssistantResult;

/// Generates text from a prompt under a token budget
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &'static str;

    /// Single attempt, no retries. An empty prompt is rejected before any
    /// network call and an empty generation is an upstream failure.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> AssistantResult<String>;
}

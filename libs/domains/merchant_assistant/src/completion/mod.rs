mod gemini;
mod openai;
mod provider;

pub use gemini::{GeminiCompletionConfig, GeminiCompletionProvider};
pub use openai::{OpenAICompletionConfig, OpenAICompletionProvider};
pub use provider::CompletionProvider;

#[cfg(test)]
pub use provider::MockCompletionProvider;

use std::sync::Arc;

use crate::config::ProviderKind;
use crate::error::{AssistantError, AssistantResult, UpstreamService};
use crate::upstream;

/// Build the configured completion provider from the environment
pub fn from_env(kind: ProviderKind) -> AssistantResult<Arc<dyn CompletionProvider>> {
    let provider: Arc<dyn CompletionProvider> = match kind {
        ProviderKind::Gemini => Arc::new(GeminiCompletionProvider::from_env()?),
        ProviderKind::OpenAi => Arc::new(OpenAICompletionProvider::from_env()?),
    };
    Ok(provider)
}

pub(crate) fn ensure_prompt(prompt: &str, max_tokens: u32) -> AssistantResult<()> {
    if prompt.trim().is_empty() {
        return Err(AssistantError::InvalidInput(
            "prompt must not be empty".to_string(),
        ));
    }
    if max_tokens == 0 {
        return Err(AssistantError::InvalidInput(
            "max_tokens must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn non_empty_text(text: String) -> AssistantResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(upstream::malformed(
            UpstreamService::Completion,
            "completion returned no text",
        ));
    }
    Ok(trimmed.to_string())
}

mod gemini;
mod openai;
mod provider;

pub use gemini::{GeminiEmbeddingConfig, GeminiEmbeddingProvider};
pub use openai::{OpenAIEmbeddingConfig, OpenAIEmbeddingProvider};
pub use provider::EmbeddingProvider;

#[cfg(test)]
pub use provider::MockEmbeddingProvider;

use std::sync::Arc;

use crate::config::ProviderKind;
use crate::error::{AssistantError, AssistantResult, UpstreamService};
use crate::upstream;

/// Build the configured embedding provider from the environment
pub fn from_env(kind: ProviderKind) -> AssistantResult<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match kind {
        ProviderKind::Gemini => Arc::new(GeminiEmbeddingProvider::from_env()?),
        ProviderKind::OpenAi => Arc::new(OpenAIEmbeddingProvider::from_env()?),
    };
    Ok(provider)
}

pub(crate) fn ensure_embeddable(text: &str) -> AssistantResult<()> {
    if text.trim().is_empty() {
        return Err(AssistantError::InvalidInput(
            "text to embed must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Reject vectors the index could not store
pub(crate) fn check_vector(values: Vec<f32>, expected: u32) -> AssistantResult<Vec<f32>> {
    if values.is_empty() {
        return Err(upstream::malformed(
            UpstreamService::Embedding,
            "empty embedding",
        ));
    }
    if values.len() != expected as usize {
        return Err(upstream::malformed(
            UpstreamService::Embedding,
            format!("expected {} dimensions, got {}", expected, values.len()),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(upstream::malformed(
            UpstreamService::Embedding,
            "embedding contains non-finite values",
        ));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_rejected() {
        assert!(matches!(
            ensure_embeddable(" \n\t"),
            Err(AssistantError::InvalidInput(_))
        ));
        assert!(ensure_embeddable("hello").is_ok());
    }

    #[test]
    fn test_wrong_dimension_is_upstream_error() {
        let err = check_vector(vec![0.1, 0.2], 3).unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Upstream {
                service: UpstreamService::Embedding,
                ..
            }
        ));
        assert!(check_vector(vec![], 3).is_err());
        assert!(check_vector(vec![0.1, f32::NAN, 0.3], 3).is_err());
        assert_eq!(check_vector(vec![0.1, 0.2, 0.3], 3).unwrap().len(), 3);
    }
}

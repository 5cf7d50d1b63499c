use async_trait::async_trait;

use crate::error::AssistantResult;

/// Turns free text into a fixed-length vector.
///
/// Implementations make a single attempt; retries are the caller's decision.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &'static str;

    /// Length of every vector `embed` returns
    fn dimension(&self) -> u32;

    /// Embed one text.
    ///
    /// Blank input is rejected before any network call.
    async fn embed(&self, text: &str) -> AssistantResult<Vec<f32>>;
}

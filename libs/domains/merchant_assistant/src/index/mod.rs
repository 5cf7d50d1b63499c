//! Per-merchant nearest-neighbour search over stored embeddings.

mod config;
mod memory;
mod qdrant;

pub use config::{IndexBackend, IndexConfig, QdrantConfig};
pub use memory::InMemoryVectorIndex;
pub use qdrant::QdrantVectorIndex;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AssistantError, AssistantResult};
use crate::models::{EmbeddingRecord, VectorMatch};

/// Vector store seam.
///
/// Every query carries a merchant filter and every record carries the
/// merchant tag, so one merchant never sees another's history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name used in logs
    fn name(&self) -> &'static str;

    /// Create the index if missing. Idempotent and safe to race.
    async fn ensure_ready(&self) -> AssistantResult<()>;

    /// Whether the index currently answers requests
    async fn is_ready(&self) -> bool;

    /// Insert or replace a record by its id
    async fn upsert(&self, record: EmbeddingRecord) -> AssistantResult<()>;

    /// Up to `top_k` matches for `merchant_id`, best first.
    ///
    /// Ties on score are broken by the newer record first. Backends that
    /// rank remotely re-order a bounded over-fetch, so a tie wider than that
    /// window at the cut-off is only as stable as the backend's own order.
    async fn query(
        &self,
        vector: &[f32],
        merchant_id: &str,
        top_k: usize,
    ) -> AssistantResult<Vec<VectorMatch>>;
}

/// Build the configured index
pub fn from_config(config: IndexConfig) -> AssistantResult<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match config.backend {
        IndexBackend::Qdrant => Arc::new(QdrantVectorIndex::new(config.qdrant)?),
        IndexBackend::Memory => {
            Arc::new(InMemoryVectorIndex::with_dimension(config.qdrant.dimension))
        }
    };
    Ok(index)
}

pub(crate) fn validate_query(vector: &[f32], merchant_id: &str) -> AssistantResult<()> {
    if vector.is_empty() {
        return Err(AssistantError::InvalidInput(
            "query vector must not be empty".to_string(),
        ));
    }
    if merchant_id.trim().is_empty() {
        return Err(AssistantError::InvalidInput(
            "merchant_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_record(record: &EmbeddingRecord, dimension: Option<u32>) -> AssistantResult<()> {
    if record.merchant_id.trim().is_empty() {
        return Err(AssistantError::InvalidInput(
            "embedding record must carry a merchant_id".to_string(),
        ));
    }
    match dimension {
        Some(expected) if record.vector.len() != expected as usize => {
            Err(AssistantError::InvalidInput(format!(
                "embedding has {} dimensions, index expects {}",
                record.vector.len(),
                expected
            )))
        }
        _ => Ok(()),
    }
}

/// Drop foreign-tenant hits, order by score desc then recency desc, keep
/// `top_k`. The final `ref_id` comparison makes equal (score, time) pairs
/// stable across calls.
pub(crate) fn rank_matches(
    mut matches: Vec<VectorMatch>,
    merchant_id: &str,
    top_k: usize,
) -> Vec<VectorMatch> {
    matches.retain(|m| m.metadata.merchant_id == merchant_id);
    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.metadata.created_at.cmp(&a.metadata.created_at))
            .then_with(|| a.ref_id.cmp(&b.ref_id))
            .then_with(|| a.metadata.kind.cmp(&b.metadata.kind))
    });
    matches.truncate(top_k);
    matches
}

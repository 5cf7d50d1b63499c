use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{VectorIndex, rank_matches, validate_query, validate_record};
use crate::error::AssistantResult;
use crate::models::{EmbeddingRecord, VectorMatch, VectorMetadata};

/// In-memory cosine index (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorIndex {
    records: Arc<RwLock<HashMap<Uuid, EmbeddingRecord>>>,
    dimension: Option<u32>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject records whose length differs from `dimension`
    pub fn with_dimension(dimension: u32) -> Self {
        Self {
            records: Arc::default(),
            dimension: Some(dimension),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Records pointing at one interaction
    pub async fn records_for(&self, ref_id: Uuid) -> Vec<EmbeddingRecord> {
        let records = self.records.read().await;
        let mut found: Vec<EmbeddingRecord> = records
            .values()
            .filter(|r| r.ref_id == ref_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.kind);
        found
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_ready(&self) -> AssistantResult<()> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn upsert(&self, record: EmbeddingRecord) -> AssistantResult<()> {
        validate_record(&record, self.dimension)?;

        let mut records = self.records.write().await;
        records.insert(record.id, record);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        merchant_id: &str,
        top_k: usize,
    ) -> AssistantResult<Vec<VectorMatch>> {
        validate_query(vector, merchant_id)?;
        if top_k == 0 {
            return Ok(vec![]);
        }

        let records = self.records.read().await;
        let candidates: Vec<VectorMatch> = records
            .values()
            .filter(|r| r.merchant_id == merchant_id)
            .map(|r| VectorMatch {
                ref_id: r.ref_id,
                score: cosine_similarity(vector, &r.vector),
                metadata: VectorMetadata {
                    merchant_id: r.merchant_id.clone(),
                    kind: r.kind,
                    created_at: r.created_at,
                },
            })
            .collect();

        Ok(rank_matches(candidates, merchant_id, top_k))
    }
}

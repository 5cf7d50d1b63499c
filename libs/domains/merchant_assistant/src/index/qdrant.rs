use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
    Filter, PointId, PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder, point_id::PointIdOptions, value::Kind,
};
use uuid::Uuid;

use super::{QdrantConfig, VectorIndex, rank_matches, validate_query, validate_record};
use crate::error::{AssistantError, AssistantResult};
use crate::models::{EmbeddingKind, EmbeddingRecord, VectorMatch, VectorMetadata};

const MERCHANT_ID: &str = "merchant_id";
const REF_ID: &str = "ref_id";
const KIND: &str = "kind";
const CREATED_AT_MS: &str = "created_at_ms";

/// Qdrant-backed vector index over a single collection
pub struct QdrantVectorIndex {
    client: Qdrant,
    config: QdrantConfig,
}

impl QdrantVectorIndex {
    pub fn new(config: QdrantConfig) -> AssistantResult<Self> {
        let mut builder = Qdrant::from_url(&config.url).timeout(config.timeout);

        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| AssistantError::Config(format!("Failed to build Qdrant client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_client(client: Qdrant, config: QdrantConfig) -> Self {
        Self { client, config }
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    async fn create_collection(&self) -> AssistantResult<()> {
        let builder = CreateCollectionBuilder::new(&self.config.collection).vectors_config(
            VectorParamsBuilder::new(self.config.dimension as u64, Distance::Cosine),
        );

        if let Err(err) = self.client.create_collection(builder).await {
            // another replica may have created it between our check and create
            if self.client.collection_exists(&self.config.collection).await? {
                tracing::debug!(
                    collection = %self.config.collection,
                    "Collection created concurrently"
                );
                return Ok(());
            }
            return Err(err.into());
        }

        tracing::info!(
            collection = %self.config.collection,
            dimension = self.config.dimension,
            "Created vector collection"
        );
        Ok(())
    }

    fn payload(record: &EmbeddingRecord) -> HashMap<String, QdrantValue> {
        HashMap::from([
            (
                MERCHANT_ID.to_string(),
                QdrantValue::from(record.merchant_id.clone()),
            ),
            (REF_ID.to_string(), QdrantValue::from(record.ref_id.to_string())),
            (KIND.to_string(), QdrantValue::from(record.kind.to_string())),
            (
                CREATED_AT_MS.to_string(),
                QdrantValue::from(record.created_at.timestamp_millis()),
            ),
        ])
    }

    /// Convert a hit back into a match. Points missing any metadata field
    /// are skipped rather than failing the whole query.
    fn to_match(point: ScoredPoint) -> Option<VectorMatch> {
        let payload = &point.payload;

        let merchant_id = string_field(payload, MERCHANT_ID)?;
        let ref_id = string_field(payload, REF_ID)
            .and_then(|s| Uuid::parse_str(&s).ok())
            .or_else(|| point.id.as_ref().and_then(point_id_to_uuid))?;
        let kind: EmbeddingKind = string_field(payload, KIND)?.parse().ok()?;
        let created_at = match payload.get(CREATED_AT_MS).and_then(|v| v.kind.as_ref()) {
            Some(Kind::IntegerValue(ms)) => DateTime::from_timestamp_millis(*ms)?,
            _ => return None,
        };

        Some(VectorMatch {
            ref_id,
            score: point.score,
            metadata: VectorMetadata {
                merchant_id,
                kind,
                created_at,
            },
        })
    }
}

fn string_field(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn point_id_to_uuid(point_id: &PointId) -> Option<Uuid> {
    match &point_id.point_id_options {
        Some(PointIdOptions::Uuid(raw)) => Uuid::parse_str(raw).ok(),
        _ => None,
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    fn name(&self) -> &'static str {
        "qdrant"
    }

    async fn ensure_ready(&self) -> AssistantResult<()> {
        if !self.client.collection_exists(&self.config.collection).await? {
            self.create_collection().await?;
        }

        // Keyword index keeps the merchant filter cheap; re-creating is a no-op
        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(
                    &self.config.collection,
                    MERCHANT_ID,
                    FieldType::Keyword,
                )
                .wait(true),
            )
            .await?;

        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client
            .collection_exists(&self.config.collection)
            .await
            .unwrap_or(false)
    }

    async fn upsert(&self, record: EmbeddingRecord) -> AssistantResult<()> {
        validate_record(&record, Some(self.config.dimension))?;

        let point = PointStruct::new(
            PointId::from(record.id.to_string()),
            record.vector.clone(),
            Self::payload(&record),
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, vec![point]).wait(true))
            .await?;

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

        let limit = self.config.search_limit(top_k);
        let builder = SearchPointsBuilder::new(&self.config.collection, vector.to_vec(), limit)
            .filter(Filter::must([Condition::matches(
                MERCHANT_ID,
                merchant_id.to_string(),
            )]))
            .with_payload(true);

        let response = self.client.search_points(builder).await?;

        let matches: Vec<VectorMatch> = response
            .result
            .into_iter()
            .filter_map(Self::to_match)
            .collect();

        Ok(rank_matches(matches, merchant_id, top_k))
    }
}

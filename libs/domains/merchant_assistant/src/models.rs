use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Rejects strings that are empty once surrounding whitespace is removed
fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// Known facts about the merchant, rendered into the prompt when present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct MerchantProfile {
    #[validate(length(max = 200))]
    pub business_name: Option<String>,
    #[validate(length(max = 100))]
    pub industry: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    /// ISO 4217 code, e.g. "USD"
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    /// Average monthly revenue in minor currency units
    #[validate(range(min = 0))]
    pub monthly_revenue: Option<i64>,
    #[serde(default)]
    pub goals: Vec<String>,
}

impl MerchantProfile {
    pub fn is_empty(&self) -> bool {
        self.business_name.is_none()
            && self.industry.is_none()
            && self.location.is_none()
            && self.currency.is_none()
            && self.monthly_revenue.is_none()
            && self.goals.is_empty()
    }
}

/// One query/response exchange between a merchant and the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Interaction {
    /// Unique identifier
    pub id: Uuid,
    /// Owning merchant; every retrieval is scoped to it
    pub merchant_id: String,
    /// The merchant's question
    pub query: String,
    /// Generated answer
    pub response: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(merchant_id: String, query: String, response: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            merchant_id,
            query,
            response,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply updates from UpdateInteraction DTO
    pub fn apply_update(&mut self, update: UpdateInteraction) {
        if let Some(query) = update.query {
            self.query = query;
        }
        if let Some(response) = update.response {
            self.response = response;
        }
        self.updated_at = Utc::now();
    }
}

/// DTO for asking the assistant a new question
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateInteraction {
    #[validate(length(max = 255), custom(function = "validate_not_blank"))]
    pub merchant_id: String,
    #[validate(length(max = 8000), custom(function = "validate_not_blank"))]
    pub query: String,
    #[serde(default)]
    #[validate(nested)]
    pub profile: Option<MerchantProfile>,
}

impl CreateInteraction {
    pub fn new(merchant_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            query: query.into(),
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: MerchantProfile) -> Self {
        self.profile = Some(profile);
        self
    }
}

/// DTO for the CRUD edit flow; embeddings are not recomputed
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateInteraction {
    #[validate(custom(function = "validate_not_blank"))]
    pub query: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub response: Option<String>,
}

/// Query filters for listing interactions
#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
pub struct InteractionFilter {
    pub merchant_id: Option<String>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 200))]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for InteractionFilter {
    fn default() -> Self {
        Self {
            merchant_id: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl InteractionFilter {
    pub fn for_merchant(merchant_id: impl Into<String>) -> Self {
        Self {
            merchant_id: Some(merchant_id.into()),
            ..Default::default()
        }
    }
}

/// Which side of a turn an embedding was computed from
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmbeddingKind {
    Query,
    Response,
}

/// A vector stored in the index, referencing the interaction that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: Uuid,
    pub ref_id: Uuid,
    pub merchant_id: String,
    pub kind: EmbeddingKind,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    pub fn for_interaction(interaction: &Interaction, kind: EmbeddingKind, vector: Vec<f32>) -> Self {
        Self {
            id: Self::record_id(interaction.id, kind),
            ref_id: interaction.id,
            merchant_id: interaction.merchant_id.clone(),
            kind,
            vector,
            created_at: interaction.created_at,
        }
    }

    /// Stable id per (interaction, kind) so a repeated upsert replaces the record
    pub fn record_id(ref_id: Uuid, kind: EmbeddingKind) -> Uuid {
        Uuid::new_v5(&ref_id, kind.to_string().as_bytes())
    }
}

/// Metadata returned alongside a similarity match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub merchant_id: String,
    pub kind: EmbeddingKind,
    pub created_at: DateTime<Utc>,
}

/// A similarity search hit
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub ref_id: Uuid,
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// A prior exchange rendered into the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextPair {
    pub query: String,
    pub response: String,
}

/// Prior exchanges ordered most relevant first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievedContext {
    pub pairs: Vec<ContextPair>,
}

impl RetrievedContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

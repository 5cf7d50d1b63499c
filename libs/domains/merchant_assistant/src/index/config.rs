use std::time::Duration;

use core_config::{env_duration_secs, env_optional, env_or_default, env_parse};
use strum::{Display, EnumString};

use crate::config::embedding_dimension_from_env;
use crate::error::{AssistantError, AssistantResult};

/// Storage behind the vector index seam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IndexBackend {
    #[default]
    Qdrant,
    /// Process-local; contents are lost on restart
    Memory,
}

/// Qdrant connection and collection settings
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub collection: String,
    pub dimension: u32,
    /// Candidates fetched beyond `top_k` so score ties at the cut-off are
    /// ordered by recency locally. Ties wider than this fall back to
    /// Qdrant's internal order.
    pub tie_overfetch: usize,
}

impl QdrantConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_dimension(mut self, dimension: u32) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_tie_overfetch(mut self, tie_overfetch: usize) -> Self {
        self.tie_overfetch = tie_overfetch;
        self
    }

    /// Number of points to request from Qdrant for a `top_k` query
    pub fn search_limit(&self, top_k: usize) -> u64 {
        top_k.saturating_add(self.tie_overfetch) as u64
    }

    pub fn from_env() -> AssistantResult<Self> {
        Ok(Self {
            url: env_or_default("QDRANT_URL", "http://localhost:6334"),
            api_key: env_optional("QDRANT_API_KEY"),
            timeout: env_duration_secs("QDRANT_TIMEOUT_SECS", 10)?,
            collection: env_or_default("QDRANT_COLLECTION", "merchant-assistant"),
            dimension: embedding_dimension_from_env()?,
            tie_overfetch: env_parse("QDRANT_TIE_OVERFETCH", 16)?,
        })
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            collection: "merchant-assistant".to_string(),
            dimension: 768,
            tie_overfetch: 16,
        }
    }
}

/// Index selection plus backend settings
#[derive(Debug, Clone, Default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub qdrant: QdrantConfig,
}

impl IndexConfig {
    /// Reads VECTOR_INDEX (qdrant|memory) and the QDRANT_* settings
    pub fn from_env() -> AssistantResult<Self> {
        let raw = env_or_default("VECTOR_INDEX", "qdrant");
        let backend = raw.parse().map_err(|_| {
            AssistantError::Config(format!("VECTOR_INDEX: unknown backend '{raw}'"))
        })?;

        Ok(Self {
            backend,
            qdrant: QdrantConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("VECTOR_INDEX", None::<&str>),
                ("QDRANT_URL", None),
                ("QDRANT_API_KEY", None),
                ("QDRANT_COLLECTION", None),
                ("QDRANT_TIMEOUT_SECS", None),
                ("EMBEDDING_DIMENSION", None),
                ("QDRANT_TIE_OVERFETCH", None),
            ],
            || {
                let config = IndexConfig::from_env().unwrap();
                assert_eq!(config.backend, IndexBackend::Qdrant);
                assert_eq!(config.qdrant.search_limit(3), 19);
                assert_eq!(config.qdrant.url, "http://localhost:6334");
                assert_eq!(config.qdrant.collection, "merchant-assistant");
                assert_eq!(config.qdrant.dimension, 768);
                assert!(config.qdrant.api_key.is_none());
            },
        );
    }

    #[test]
    fn test_memory_backend_and_overrides() {
        temp_env::with_vars(
            [
                ("VECTOR_INDEX", Some("memory")),
                ("QDRANT_COLLECTION", Some("assistant-staging")),
                ("EMBEDDING_DIMENSION", Some("1536")),
            ],
            || {
                let config = IndexConfig::from_env().unwrap();
                assert_eq!(config.backend, IndexBackend::Memory);
                assert_eq!(config.qdrant.collection, "assistant-staging");
                assert_eq!(config.qdrant.dimension, 1536);
            },
        );
    }

    #[test]
    fn test_tie_overfetch_override() {
        temp_env::with_var("QDRANT_TIE_OVERFETCH", Some("200"), || {
            let config = QdrantConfig::from_env().unwrap();
            assert_eq!(config.tie_overfetch, 200);
            assert_eq!(config.search_limit(6), 206);
        });

        temp_env::with_var("QDRANT_TIE_OVERFETCH", Some("-1"), || {
            assert!(QdrantConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_unknown_backend() {
        temp_env::with_var("VECTOR_INDEX", Some("pinecone"), || {
            assert!(matches!(
                IndexConfig::from_env(),
                Err(AssistantError::Config(_))
            ));
        });
    }
}

use core_config::{env_or_default, env_parse};
use strum::{Display, EnumString};

use crate::error::{AssistantError, AssistantResult};

/// Which hosted model family backs a provider seam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[strum(serialize = "openai")]
    OpenAi,
}

impl ProviderKind {
    fn from_env_key(key: &str) -> AssistantResult<Self> {
        let raw = env_or_default(key, "gemini");
        raw.parse()
            .map_err(|_| AssistantError::Config(format!("{key}: unknown provider '{raw}'")))
    }
}

/// Provider selection read at startup
#[derive(Debug, Clone, Copy)]
pub struct ProvidersConfig {
    pub embedding: ProviderKind,
    pub completion: ProviderKind,
}

impl ProvidersConfig {
    /// Reads EMBEDDING_PROVIDER and COMPLETION_PROVIDER (default: gemini)
    pub fn from_env() -> AssistantResult<Self> {
        Ok(Self {
            embedding: ProviderKind::from_env_key("EMBEDDING_PROVIDER")?,
            completion: ProviderKind::from_env_key("COMPLETION_PROVIDER")?,
        })
    }
}

/// Vector length produced by the embedding model; the index is created with it
pub fn embedding_dimension_from_env() -> AssistantResult<u32> {
    let dimension: u32 = env_parse("EMBEDDING_DIMENSION", 768)?;
    if dimension == 0 {
        return Err(AssistantError::Config(
            "EMBEDDING_DIMENSION must be greater than zero".to_string(),
        ));
    }
    Ok(dimension)
}

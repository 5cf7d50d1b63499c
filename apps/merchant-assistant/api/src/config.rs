use core_config::{AppInfo, FromEnv, app_info, database::DatabaseConfig, server::ServerConfig};
use domain_merchant_assistant::{AssistantConfig, IndexConfig, ProvidersConfig};

pub use core_config::Environment;

/// Application configuration composed from the shared config crates
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub providers: ProvidersConfig,
    pub index: IndexConfig,
    pub assistant: AssistantConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?, // Required - fails if DATABASE_URL is unset
            providers: ProvidersConfig::from_env()?,
            index: IndexConfig::from_env()?,
            assistant: AssistantConfig::from_env()?,
        })
    }
}

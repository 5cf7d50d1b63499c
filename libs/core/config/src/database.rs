use crate::{ConfigError, FromEnv, env_duration_secs, env_parse, env_required};
use std::time::Duration;

/// PostgreSQL connection settings
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    /// Attempts made at startup before giving up on the database
    pub connect_retries: u32,
}

impl DatabaseConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(10),
            connect_retries: 5,
        }
    }
}

impl FromEnv for DatabaseConfig {
    /// Requires DATABASE_URL; pool settings fall back to defaults
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("DATABASE_URL")?,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10)?,
            min_connections: env_parse("DATABASE_MIN_CONNECTIONS", 1)?,
            connect_timeout: env_duration_secs("DATABASE_CONNECT_TIMEOUT_SECS", 10)?,
            connect_retries: env_parse("DATABASE_CONNECT_RETRIES", 5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_from_env_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/testdb")),
                ("DATABASE_MAX_CONNECTIONS", None),
                ("DATABASE_CONNECT_RETRIES", None),
            ],
            || {
                let config = DatabaseConfig::from_env().unwrap();
                assert_eq!(config.url, "postgres://localhost/testdb");
                assert_eq!(config.max_connections, 10);
                assert_eq!(config.connect_retries, 5);
            },
        );
    }

    #[test]
    fn test_database_config_from_env_missing() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = DatabaseConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("DATABASE_URL"));
        });
    }

    #[test]
    fn test_database_config_invalid_pool_size() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/testdb")),
                ("DATABASE_MAX_CONNECTIONS", Some("many")),
            ],
            || {
                let err = DatabaseConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
            },
        );
    }
}

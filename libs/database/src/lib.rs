//! PostgreSQL connection management for the services in this workspace
//!
//! ```ignore
//! use core_config::{FromEnv, database::DatabaseConfig};
//!
//! let db = database::connect_with_retry(&DatabaseConfig::from_env()?).await?;
//! database::run_migrations::<migration::Migrator>(&db, "merchant_assistant_api").await?;
//! ```

pub mod postgres;
pub mod retry;

pub use postgres::{check_health, connect, connect_with_retry, run_migrations};
pub use retry::{RetryConfig, retry_with_backoff};
pub use sea_orm::{DatabaseConnection, DbErr};

/// Errors raised while bringing the database up
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] DbErr),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

use core_config::database::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{info, log::LevelFilter};

use crate::retry::{RetryConfig, retry_with_backoff};
use crate::{DatabaseError, DatabaseResult};

fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);
    options
}

/// Open a connection pool
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(config)).await?;
    info!(
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(db)
}

/// Open a connection pool, retrying `config.connect_retries` times with backoff
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let retry = RetryConfig::new()
        .with_max_retries(config.connect_retries)
        .with_initial_delay(Duration::from_millis(500));

    retry_with_backoff(|| connect(config), retry).await
}

/// Apply every pending migration of `M`
pub async fn run_migrations<M: MigratorTrait>(
    db: &DatabaseConnection,
    app_name: &str,
) -> DatabaseResult<()> {
    info!("Running {} database migrations...", app_name);
    M::up(db, None)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
    info!("Migrations completed for {}", app_name);
    Ok(())
}

/// Connectivity probe for readiness checks
pub async fn check_health(db: &DatabaseConnection) -> DatabaseResult<()> {
    db.ping()
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_follow_config() {
        let mut config = DatabaseConfig::new("postgres://localhost/merchants".to_string());
        config.max_connections = 25;
        config.connect_timeout = Duration::from_secs(3);

        let options = connect_options(&config);
        assert_eq!(options.get_url(), "postgres://localhost/merchants");
        assert_eq!(options.get_max_connections(), Some(25));
        assert_eq!(options.get_connect_timeout(), Some(Duration::from_secs(3)));
    }
}

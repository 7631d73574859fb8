//! PostgreSQL pool for the `postgres` storage provider.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use chathub_core::config::database::DatabaseConfig;
use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;

/// Name reported in `pg_stat_activity`.
const APPLICATION_NAME: &str = "chathub";

/// Shared sqlx pool handed to every repository.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Opens the pool and waits for the first connection.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Invalid database.url", e)
            })?
            .application_name(APPLICATION_NAME);

        info!(
            host = options.get_host(),
            database = options.get_database().unwrap_or_default(),
            max_connections = config.max_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to connect to PostgreSQL", e))?;

        Ok(Self { pool })
    }

    /// The sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trips `SELECT 1`.
    pub async fn health_check(&self) -> AppResult<bool> {
        let one: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Storage health check failed", e))?;
        Ok(one == 1)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }
}

// Database connection management
use crate::error::{DatabaseError, DatabaseResult};
use crate::schema::SCHEMA;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pool sizing and timeouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DatabasePool {
    pool: Arc<PgPool>,
}

impl DatabasePool {
    /// Create a new database pool from connection string
    pub async fn new(connection_string: &str) -> DatabaseResult<Self> {
        Self::with_settings(connection_string, &PoolSettings::default()).await
    }

    pub async fn with_settings(connection_string: &str, settings: &PoolSettings) -> DatabaseResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
            .connect(connection_string)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = settings.max_connections, "Database connection pool created");

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Get the underlying PgPool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the pool is healthy
    pub async fn is_healthy(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(self.pool.as_ref()).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Database health check failed: {}", e);
                false
            }
        }
    }

    /// Create the pricing tables when they do not exist yet
    pub async fn apply_schema(&self) -> DatabaseResult<()> {
        self.pool
            .execute(SCHEMA)
            .await
            .map_err(|e| DatabaseError::SchemaError(e.to_string()))?;
        info!("Pricing schema is in place");
        Ok(())
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_settings_defaults() {
        let settings = PoolSettings::default();
        assert!(settings.min_connections <= settings.max_connections);
        assert_eq!(settings.acquire_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_unreachable_database_reports_connection_failure() {
        let settings = PoolSettings {
            acquire_timeout_secs: 1,
            min_connections: 0,
            ..PoolSettings::default()
        };
        let result = DatabasePool::with_settings("postgres://nobody@127.0.0.1:1/none", &settings).await;
        assert!(matches!(result, Err(DatabaseError::ConnectionFailed(_))));
    }
}

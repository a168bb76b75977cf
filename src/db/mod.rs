pub mod config;
pub mod memory;
pub mod migrate;
pub mod operations;

use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::config::DbConfig;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct DatabaseProxy {
    pool: PgPool,
}

impl DatabaseProxy {
    pub async fn connect(config: DbConfig) -> Result<Arc<Self>, DbInitError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.primary_url)
            .await
            .map_err(DbInitError::Sqlx)?;

        tracing::info!(
            max_connections = config.max_connections,
            "database pool connected"
        );
        Ok(Arc::new(Self { pool }))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip latency of `SELECT 1`, or the failure reason.
    pub async fn check_health(&self) -> Result<Duration, String> {
        let started = Instant::now();
        let result =
            tokio::time::timeout(HEALTH_CHECK_TIMEOUT, sqlx::query("SELECT 1").execute(&self.pool))
                .await;

        match result {
            Ok(Ok(_)) => Ok(started.elapsed()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err("timeout".to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub primary_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// `None` when `DATABASE_URL` is unset or blank.
    pub fn from_env_optional() -> Result<Option<Self>, DbConfigError> {
        match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_url(url).map(Some),
            _ => Ok(None),
        }
    }

    pub fn with_url(primary_url: String) -> Result<Self, DbConfigError> {
        let max_connections = env_u32("DB_MAX_CONNECTIONS", 10);
        if max_connections == 0 {
            return Err(DbConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }
        let acquire_timeout_ms = env_u64("DB_ACQUIRE_TIMEOUT_MS", 5000);

        Ok(Self {
            primary_url,
            max_connections,
            acquire_timeout: Duration::from_millis(acquire_timeout_ms),
        })
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

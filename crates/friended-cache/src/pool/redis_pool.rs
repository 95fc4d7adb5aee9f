//! Redis connections for push fan-out
//!
//! Friended only talks to Redis to publish push notifications on `push:user:{id}` and
//! to answer readiness checks, so a small deadpool is enough.

use std::sync::Arc;
use std::time::{Duration, Instant};

use deadpool_redis::{Config, Pool, Runtime};

#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// `redis://[user:password@]host:port[/db]`
    pub url: String,
    pub max_connections: usize,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 16,
        }
    }
}

impl From<&friended_common::RedisConfig> for RedisPoolConfig {
    fn from(config: &friended_common::RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("invalid Redis pool settings: {0}")]
    Build(String),

    #[error("no Redis connection available: {0}")]
    Checkout(#[from] deadpool_redis::PoolError),

    #[error("Redis command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("push payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Pool shared by the push publisher and the readiness check
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisPool")
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

/// Host part of a Redis URL, without credentials
fn redacted_url(url: &str) -> &str {
    url.split('@').next_back().unwrap_or(url)
}

impl RedisPool {
    /// Build the pool. No connection is opened until the first checkout.
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map_err(|e| RedisPoolError::Build(e.to_string()))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::Build(e.to_string()))?;

        tracing::info!(
            host = %redacted_url(&config.url),
            max_connections = config.max_connections,
            "Push Redis pool ready"
        );

        Ok(Self { pool })
    }

    pub fn from_config(config: &friended_common::RedisConfig) -> RedisResult<Self> {
        Self::new(RedisPoolConfig::from(config))
    }

    pub async fn get(&self) -> RedisResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    #[must_use]
    pub fn status(&self) -> deadpool_redis::Status {
        self.pool.status()
    }

    /// Round trip of a `PING`
    pub async fn ping(&self) -> RedisResult<Duration> {
        let started = Instant::now();
        let mut conn = self.get().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        let elapsed = started.elapsed();
        tracing::trace!(elapsed_ms = elapsed.as_millis() as u64, "Redis ping");
        Ok(elapsed)
    }
}

pub type SharedRedisPool = Arc<RedisPool>;

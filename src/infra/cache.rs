//! Redis cache implementation.
//!
//! Short-lived JSON values with a TTL over a multiplexed connection manager.
//! Holds the admin confirmation state for the relational deployment.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{de::DeserializeOwned, Serialize};

use super::HealthCheck;
use crate::config::Config;
use crate::errors::{AppError, AppResult};

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Connect to Redis.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let client = Client::open(config.redis_url.as_str()).map_err(cache_error)?;
        let connection = ConnectionManager::new(client).await.map_err(cache_error)?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }

    /// Get a value from cache.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(cache_error)?;
        value.map(|json| parse(&json)).transpose()
    }

    /// Set a value in cache with a TTL (in seconds).
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let json = serialize(value)?;

        conn.set_ex::<_, _, ()>(key, json, ttl_seconds)
            .await
            .map_err(cache_error)?;

        Ok(())
    }

    /// Overwrite a value without touching its remaining TTL.
    ///
    /// Returns false when the key no longer exists.
    pub async fn replace_keep_ttl<T: Serialize>(&self, key: &str, value: &T) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        let json = serialize(value)?;

        // XX: only an existing key, KEEPTTL: Redis 6.0+
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(json)
            .arg("XX")
            .arg("KEEPTTL")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(reply.is_some())
    }

    /// Atomically read and delete a value (Redis 6.2+ GETDEL).
    pub async fn take<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        value.map(|json| parse(&json)).transpose()
    }

    /// Delete a value from cache.
    /// Uses UNLINK for non-blocking deletion.
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: i64 = redis::cmd("UNLINK")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    /// Check if a key exists in cache.
    pub async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(key).await.map_err(cache_error)?;
        Ok(exists)
    }
}

#[async_trait]
impl HealthCheck for Cache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}

fn serialize<T: Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))
}

fn parse<T: DeserializeOwned>(json: &str) -> AppResult<T> {
    serde_json::from_str(json)
        .map_err(|e| AppError::internal(format!("Cache deserialization error: {}", e)))
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    AppError::Cache(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_errors_are_infrastructure_errors() {
        let err = cache_error(RedisError::from((redis::ErrorKind::IoError, "refused")));
        assert!(err.is_retryable());
        assert_eq!(err.code(), "INFRASTRUCTURE_ERROR");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse::<u32>("not json").is_err());
        assert_eq!(parse::<u32>("7").unwrap(), 7);
    }
}

//! Redis-backed shared cache.
//!
//! Thin TTL wrapper over `SET ... EX` / `GET` / `DEL`. Uses the same
//! connection pattern as the channel: one auto-reconnecting
//! `ConnectionManager`, cloned per operation, no per-operation locks, and
//! bounded exponential backoff at establishment time only.

use crate::error::CacheError;
use crate::SharedCache;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{info, warn};

const INITIAL_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 30_000;

/// Shared cache over Redis. Cheaply cloneable.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect with one attempt. Prefer [`RedisCache::connect_with_backoff`]
    /// at process startup.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the cache is unreachable.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        // Do NOT log the URL; it may embed credentials.
        let client = Client::open(url)
            .map_err(|e| CacheError::Connection(format!("invalid cache URL: {e}")))?;

        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Connection(format!("cache unreachable: {e}")))?;

        Ok(Self { connection })
    }

    /// Connect with bounded exponential backoff; exhaustion is fatal at boot.
    ///
    /// # Errors
    ///
    /// Returns the last `CacheError::Connection` once the budget is spent.
    pub async fn connect_with_backoff(url: &str, max_attempts: u32) -> Result<Self, CacheError> {
        let mut backoff = INITIAL_BACKOFF_MS;
        let mut last_error = CacheError::Connection("no connection attempts made".to_string());

        for attempt in 1..=max_attempts {
            match Self::connect(url).await {
                Ok(cache) => {
                    info!(target: "hx.cache.redis", attempt, "Connected to cache");
                    return Ok(cache);
                }
                Err(e) => {
                    warn!(
                        target: "hx.cache.redis",
                        attempt,
                        max_attempts,
                        backoff_ms = backoff,
                        error = %e,
                        "Cache connection failed, will retry"
                    );
                    last_error = e;
                    if attempt < max_attempts {
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF_MS);
                    }
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl SharedCache for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        // Redis rejects EX 0; a sub-second TTL still gets one second.
        let seconds = ttl.as_secs().max(1);
        let set: Result<(), _> = conn.set_ex(key, value, seconds).await;
        set.map_err(|e| CacheError::Operation(format!("SET {key} failed: {e}")))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Result<Option<String>, _> = conn.get(key).await;
        value.map_err(|e| CacheError::Operation(format!("GET {key} failed: {e}")))
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let removed: Result<i64, _> = conn.del(key).await;
        removed
            .map(|_| ())
            .map_err(|e| CacheError::Operation(format!("DEL {key} failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let result = RedisCache::connect("not-a-redis-url").await;
        assert!(matches!(result, Err(CacheError::Connection(_))));
    }
}

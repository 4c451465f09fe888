//! Shared key/value cache with per-key TTL.
//!
//! The cache plays two roles in the handshake: a short-lived handoff
//! mailbox (staged identity snapshots, generated tokens) and a polling
//! target for the producer waiting on the issuer. TTL eviction is the only
//! cleanup mechanism — an entry that is never consumed simply vanishes.
//!
//! [`wait_for`] is the bounded polling helper and the one intentional
//! suspension point exposed to callers: it sleeps between attempts without
//! holding any connection, and exhausting the budget yields a first-class
//! `None` rather than an error or an indefinite block.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, trace};

pub mod error;
pub mod memory;
pub mod redis;

pub use error::CacheError;
pub use memory::InMemoryCache;
pub use redis::RedisCache;

/// Key/value store with per-key time-to-live.
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Store `value` under `key`, evicted automatically after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Fetch the value under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Remove `key` if present. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Poll `key` up to `max_attempts` times, `delay` apart.
///
/// Returns the first present value, or `None` once the whole budget
/// (`max_attempts * delay`) has elapsed with nothing appearing. Worst-case
/// latency for the caller is exactly that product; tune it to comfortably
/// exceed the issuer's expected processing time.
///
/// Infrastructure errors during a poll are logged and treated as "absent
/// this attempt" — a flaky read must not abort a handoff that the next
/// attempt could complete.
pub async fn wait_for(
    cache: &dyn SharedCache,
    key: &str,
    max_attempts: u32,
    delay: Duration,
) -> Option<String> {
    for attempt in 1..=max_attempts {
        match cache.get(key).await {
            Ok(Some(value)) => {
                debug!(target: "hx.cache", key, attempt, "Polled value became available");
                return Some(value);
            }
            Ok(None) => {
                trace!(target: "hx.cache", key, attempt, "Polled value not yet available");
            }
            Err(e) => {
                debug!(target: "hx.cache", key, attempt, error = %e, "Poll attempt failed");
            }
        }
        tokio::time::sleep(delay).await;
    }

    debug!(
        target: "hx.cache",
        key,
        max_attempts,
        delay_ms = delay.as_millis() as u64,
        "Poll budget exhausted"
    );
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_returns_immediately_when_present() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Duration::from_secs(60))
            .await
            .unwrap();

        let start = Instant::now();
        let value = wait_for(&cache, "k", 5, Duration::from_millis(500)).await;

        assert_eq!(value.as_deref(), Some("v"));
        // Found on the first attempt, before any sleep.
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_exhausts_after_full_budget() {
        let cache = InMemoryCache::new();

        let start = Instant::now();
        let value = wait_for(&cache, "missing", 4, Duration::from_millis(250)).await;

        assert_eq!(value, None);
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_picks_up_late_arrival_within_one_interval() {
        let cache = InMemoryCache::new();
        let writer = cache.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(750)).await;
            writer
                .set("k", "late", Duration::from_secs(60))
                .await
                .unwrap();
        });

        let start = Instant::now();
        let value = wait_for(&cache, "k", 10, Duration::from_millis(500)).await;

        assert_eq!(value.as_deref(), Some("late"));
        // Value appeared at 750ms; the 1000ms poll is the first to see it.
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_misses_value_that_expires_between_polls() {
        let cache = InMemoryCache::new();
        let writer = cache.clone();

        // Present only during (100ms, 300ms); polls land at 500ms steps.
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            writer
                .set("k", "blink", Duration::from_millis(200))
                .await
                .unwrap();
        });

        let value = wait_for(&cache, "k", 3, Duration::from_millis(500)).await;
        assert_eq!(value, None);
    }
}

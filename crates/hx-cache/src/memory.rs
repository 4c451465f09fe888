//! In-memory cache for tests and local development.
//!
//! Expiry is lazy: an entry past its deadline is dropped on the next read
//! of that key. Deadlines use `tokio::time::Instant` so paused-time tests
//! can drive expiry deterministically.

use crate::error::CacheError;
use crate::SharedCache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory TTL cache. Cheaply cloneable; clones share the same entries.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedCache for InMemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Operation("cache state poisoned".to_string()))?;

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Operation("cache state poisoned".to_string()))?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Operation("cache state poisoned".to_string()))?;

        entries.remove(key);
        Ok(())
    }
}

//! Key/value cache with per-key TTLs.
//!
//! The cache backs the revocation denylist and the abuse counters. Every
//! operation is fallible so callers can pick their own failure policy: the
//! brute-force guard fails open, the rate limiter fails closed, and the
//! denylist treats errors as a miss.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Shared TTL cache used for denylist entries and counters.
///
/// Backends must treat expired keys as absent. `incr` starts at zero for a
/// missing key and must preserve any TTL already set on the key.
#[async_trait]
pub trait TtlCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn incr(&self, key: &str) -> Result<i64, CacheError>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;
}

struct Entry {
    value: String,
    deadline: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= Instant::now())
    }
}

/// In-process cache backend.
///
/// Expired entries are dropped lazily on access and swept on insert so the
/// map never grows past the live working set.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtlCache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !entry.expired());
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                deadline: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(Entry::expired) {
            entries.remove(key);
        }
        match entries.get_mut(key) {
            Some(entry) => {
                let count = entry.value.parse::<i64>().unwrap_or(0) + 1;
                entry.value = count.to_string();
                Ok(count)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        deadline: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            if entry.expired() {
                entries.remove(key);
            } else {
                entry.deadline = Some(Instant::now() + ttl);
            }
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).and_then(|entry| {
            entry
                .deadline
                .and_then(|deadline| deadline.checked_duration_since(Instant::now()))
        }))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{CacheError, TtlCache};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Backend that errors on every call, for exercising failure policies.
    pub(crate) struct FailingCache;

    #[async_trait]
    impl TtlCache for FailingCache {
        async fn set(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn delete(&self, _: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn incr(&self, _: &str) -> Result<i64, CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn expire(&self, _: &str, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn ttl(&self, _: &str) -> Result<Option<Duration>, CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
    }
}

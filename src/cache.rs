//! Time-bounded query memoization.
//!
//! Two cache points exist in the pipeline: query text → analyzer verdict,
//! and generated search query → formatted retrieval result. Both are
//! plain key/value maps with TTL expiry and no other eviction policy.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// A TTL-bounded key/value cache.
///
/// Entries expire `ttl` after insertion; expired entries are dropped
/// lazily on lookup. Disabled caches (see
/// [`AssistantConfig::enable_query_cache`](crate::config::AssistantConfig))
/// are simply never constructed.
#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl QueryCache {
    /// Creates a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, if present and unexpired.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Inserts or replaces the value for `key`.
    pub async fn put(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (Instant::now(), value.to_string()));
    }

    /// Number of entries currently held (including not-yet-collected
    /// expired ones).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("hoteles cancun", "verdict-json").await;
        assert_eq!(
            cache.get("hoteles cancun").await.as_deref(),
            Some("verdict-json")
        );
        assert_eq!(cache.get("otra consulta").await, None);
    }

    #[tokio::test]
    async fn test_expiry() {
        let cache = QueryCache::new(Duration::ZERO);
        cache.put("k", "v").await;
        assert_eq!(cache.get("k").await, None);
        // The expired entry was collected by the lookup.
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_replace_refreshes_value() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("k", "old").await;
        cache.put("k", "new").await;
        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
        assert_eq!(cache.len().await, 1);
    }
}

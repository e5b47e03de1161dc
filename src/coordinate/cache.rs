//! TTL-indexed store of the most recent successful response per fingerprint.
//!
//! Expiry is lazy: entries are masked (and dropped) on the read that observes
//! them stale; there is no background sweep. Capacity is bounded — when full,
//! a `put` for a new fingerprint evicts expired entries first, then the entry
//! closest to expiry.

use async_lock::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// Shared response cache, keyed by request fingerprint.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    /// Fresh entry for `key`, or `None` once its TTL has elapsed.
    pub async fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if is_fresh(entry.expires_at, Instant::now()) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Stale: drop it so the map doesn't accumulate dead weight.
        self.entries.write().await.remove(key);
        None
    }

    /// Store a response, overwriting any prior entry for the fingerprint.
    pub async fn put(&self, key: &str, value: Value, ttl: Duration) {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            evict_one(&mut entries);
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop every cached response.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// An entry is served up to and including its expiry instant, and treated as
/// absent strictly after.
fn is_fresh(expires_at: Instant, now: Instant) -> bool {
    expires_at >= now
}

fn evict_one(entries: &mut HashMap<String, CacheEntry>) {
    let now = Instant::now();
    let expired: Vec<String> = entries
        .iter()
        .filter(|(_, e)| !is_fresh(e.expires_at, now))
        .map(|(k, _)| k.clone())
        .collect();
    if expired.is_empty() {
        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, e)| e.expires_at)
            .map(|(k, _)| k.clone())
        {
            entries.remove(&key);
        }
    } else {
        for key in expired {
            entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_returns_fresh_entry() {
        let cache = ResponseCache::new(64);
        cache.put("k", json!({"total": 100}), Duration::from_secs(5)).await;
        assert_eq!(cache.get("k").await, Some(json!({"total": 100})));
    }

    #[test]
    fn test_entry_is_fresh_at_exactly_its_expiry_instant() {
        let now = Instant::now();
        assert!(is_fresh(now, now));
        assert!(is_fresh(now + Duration::from_millis(1), now));
        assert!(!is_fresh(now, now + Duration::from_millis(1)));
    }

    #[tokio::test]
    async fn test_get_masks_expired_entry() {
        let cache = ResponseCache::new(64);
        cache.put("k", json!(1), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(cache.get("k").await, None);
        // The stale read also dropped the entry.
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_put_overwrites_unconditionally() {
        let cache = ResponseCache::new(64);
        cache.put("k", json!(1), Duration::from_secs(5)).await;
        cache.put("k", json!(2), Duration::from_secs(5)).await;
        assert_eq!(cache.get("k").await, Some(json!(2)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_prefers_evicting_expired() {
        let cache = ResponseCache::new(2);
        cache.put("stale", json!(0), Duration::from_millis(5)).await;
        cache.put("fresh", json!(1), Duration::from_secs(60)).await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        cache.put("new", json!(2), Duration::from_secs(60)).await;
        assert_eq!(cache.get("fresh").await, Some(json!(1)));
        assert_eq!(cache.get("new").await, Some(json!(2)));
        assert_eq!(cache.get("stale").await, None);
    }

    #[tokio::test]
    async fn test_capacity_evicts_nearest_expiry_when_none_expired() {
        let cache = ResponseCache::new(2);
        cache.put("soon", json!(0), Duration::from_secs(10)).await;
        cache.put("later", json!(1), Duration::from_secs(60)).await;
        cache.put("new", json!(2), Duration::from_secs(60)).await;
        assert_eq!(cache.get("soon").await, None);
        assert_eq!(cache.get("later").await, Some(json!(1)));
        assert_eq!(cache.get("new").await, Some(json!(2)));
    }
}

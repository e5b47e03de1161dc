//! Per-fingerprint round-trip tracking.
//!
//! The observed latency of each request doubles as the TTL of its cached
//! response: a slow endpoint gets a longer cooldown, a fast one refreshes
//! sooner. Smoothing halves the weight of history on every observation, and a
//! fixed tolerance absorbs decode/processing overhead beyond raw network time.

use async_lock::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// TTL returned before any observation exists for a fingerprint. Acts as a
/// minimum cooldown so a burst of first-time requests under high latency
/// cannot all race to the backend at once.
pub const DEFAULT_TTL: Duration = Duration::from_millis(5000);

/// Fixed margin added on every smoothing update.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
struct LatencyRecord {
    running_average: Duration,
    updated_at: Instant,
}

/// Exponentially-smoothed round-trip estimate per fingerprint.
///
/// Only the coordinator mutates this table, through [`record`](Self::record).
pub struct LatencyTracker {
    records: RwLock<HashMap<String, LatencyRecord>>,
    tolerance: Duration,
    default_ttl: Duration,
    max_entries: usize,
}

impl LatencyTracker {
    pub fn new(default_ttl: Duration, tolerance: Duration, max_entries: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            tolerance,
            default_ttl,
            max_entries,
        }
    }

    /// Record a completed call's round-trip time.
    ///
    /// The first observation for a fingerprint is stored as-is; subsequent
    /// ones fold in as `(average + latest) / 2 + tolerance`.
    pub async fn record(&self, key: &str, elapsed: Duration) {
        let mut records = self.records.write().await;
        match records.get_mut(key) {
            Some(record) => {
                record.running_average = (record.running_average + elapsed) / 2 + self.tolerance;
                record.updated_at = Instant::now();
            }
            None => {
                if records.len() >= self.max_entries {
                    evict_stalest(&mut records);
                }
                records.insert(
                    key.to_string(),
                    LatencyRecord {
                        running_average: elapsed,
                        updated_at: Instant::now(),
                    },
                );
            }
        }
        tracing::trace!(key, elapsed_ms = elapsed.as_millis() as u64, "latency recorded");
    }

    /// Current TTL for a fingerprint: its running average, or the default
    /// floor when nothing has been observed yet.
    pub async fn current_ttl(&self, key: &str) -> Duration {
        self.records
            .read()
            .await
            .get(key)
            .map(|r| r.running_average)
            .unwrap_or(self.default_ttl)
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

fn evict_stalest(records: &mut HashMap<String, LatencyRecord>) {
    if let Some(key) = records
        .iter()
        .min_by_key(|(_, r)| r.updated_at)
        .map(|(k, _)| k.clone())
    {
        records.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(max: usize) -> LatencyTracker {
        LatencyTracker::new(DEFAULT_TTL, DEFAULT_TOLERANCE, max)
    }

    #[tokio::test]
    async fn test_default_ttl_before_first_observation() {
        let t = tracker(64);
        assert_eq!(t.current_ttl("unseen").await, DEFAULT_TTL);
    }

    #[tokio::test]
    async fn test_first_observation_stored_as_is() {
        let t = tracker(64);
        t.record("k", Duration::from_millis(300)).await;
        assert_eq!(t.current_ttl("k").await, Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_smoothing_adds_tolerance() {
        let t = tracker(64);
        t.record("k", Duration::from_millis(200)).await;
        t.record("k", Duration::from_millis(400)).await;
        // (200 + 400) / 2 + 500
        assert_eq!(t.current_ttl("k").await, Duration::from_millis(800));
    }

    #[tokio::test]
    async fn test_capacity_evicts_stalest_record() {
        let t = tracker(2);
        t.record("a", Duration::from_millis(100)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        t.record("b", Duration::from_millis(100)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        t.record("c", Duration::from_millis(100)).await;
        assert_eq!(t.len().await, 2);
        // "a" was the stalest; its slot went to "c".
        assert_eq!(t.current_ttl("a").await, DEFAULT_TTL);
        assert_eq!(t.current_ttl("c").await, Duration::from_millis(100));
    }
}

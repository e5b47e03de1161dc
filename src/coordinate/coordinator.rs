//! Request coordinator — orchestrates fingerprinting, dedup, caching, and
//! error normalization around the network call.
//!
//! Control flow per call: compute the fingerprint; for reads, serve a fresh
//! cache entry if one exists; otherwise claim the in-flight slot. The holder
//! performs the network call, feeds the observed latency back as the cache
//! TTL, and releases on every exit path. Concurrent callers for the same
//! fingerprint wait for the holder and pick up its result from the cache
//! instead of issuing a duplicate call.

use crate::coordinate::cache::ResponseCache;
use crate::coordinate::fingerprint::fingerprint;
use crate::coordinate::latency::{LatencyTracker, DEFAULT_TOLERANCE, DEFAULT_TTL};
use crate::coordinate::locks::{InFlightLockTable, LockAttempt};
use crate::error::ApiError;
use crate::transport::{Method, Transport};

use async_lock::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Callback invoked when the backend reports an expired session
/// (e.g. to redirect the surrounding application to login).
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// Tuning knobs for the coordination layer.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// TTL used before any latency has been observed for a fingerprint.
    /// Doubles as a minimum cooldown against first-request stampedes.
    pub default_ttl: Duration,
    /// Margin added on every latency smoothing update, absorbing decode and
    /// processing overhead beyond raw network time.
    pub latency_tolerance: Duration,
    /// Upper bound on how long a dedup waiter sleeps between re-checks.
    /// The per-fingerprint wakeup normally fires sooner.
    pub poll_interval: Duration,
    /// Deadline for a dedup waiter; elapsing surfaces
    /// [`ApiError::LockTimeout`] rather than hanging forever.
    pub lock_wait_timeout: Duration,
    /// Capacity bound of the response cache.
    pub max_cache_entries: usize,
    /// Capacity bound of the latency table.
    pub max_latency_entries: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            latency_tolerance: DEFAULT_TOLERANCE,
            poll_interval: Duration::from_millis(100),
            lock_wait_timeout: Duration::from_secs(30),
            max_cache_entries: 1024,
            max_latency_entries: 4096,
        }
    }
}

/// The coordination core. One instance per backend; cheap to share via
/// `Arc` — all callers must go through the same instance for dedup and
/// caching to apply.
pub struct RequestCoordinator {
    transport: Arc<dyn Transport>,
    latency: LatencyTracker,
    cache: ResponseCache,
    locks: InFlightLockTable,
    config: CoordinatorConfig,
    /// Held bearer token; a per-call token overrides it.
    auth_token: RwLock<Option<String>>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl RequestCoordinator {
    pub fn new(transport: Arc<dyn Transport>, config: CoordinatorConfig) -> Self {
        Self {
            transport,
            latency: LatencyTracker::new(
                config.default_ttl,
                config.latency_tolerance,
                config.max_latency_entries,
            ),
            cache: ResponseCache::new(config.max_cache_entries),
            locks: InFlightLockTable::new(),
            config,
            auth_token: RwLock::new(None),
            on_session_expired: None,
        }
    }

    /// Install the session-expiry callback. Invoked at most once per failed
    /// call whose backend code is [`SESSION_EXPIRED_CODE`](crate::error::SESSION_EXPIRED_CODE).
    pub fn with_session_expired_hook(mut self, hook: SessionExpiredHook) -> Self {
        self.on_session_expired = Some(hook);
        self
    }

    /// Set the held bearer token attached to outbound calls.
    pub async fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().await = token;
    }

    /// Clear the held bearer token.
    pub async fn clear_auth_token(&self) {
        *self.auth_token.write().await = None;
    }

    /// Seed the held token before the coordinator is shared. Only the
    /// builder calls this; nothing can contend for the lock yet.
    pub(crate) fn seed_auth_token(&self, token: String) {
        let guard = self.auth_token.try_write();
        debug_assert!(
            guard.is_some(),
            "auth token seeded while the coordinator is contended"
        );
        if let Some(mut guard) = guard {
            *guard = Some(token);
        }
    }

    /// Execute a request through the coordination layer.
    ///
    /// Read methods may be answered from the cache or by the result of an
    /// identical in-flight request; mutating methods are serialized per
    /// fingerprint but never cached. The token argument overrides the held
    /// token for this call only; absence of both is not an error here.
    pub async fn execute(
        &self,
        endpoint_id: &str,
        payload: &Value,
        method: Method,
        auth_token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let key = fingerprint(endpoint_id, payload);
        let deadline = Instant::now() + self.config.lock_wait_timeout;

        loop {
            if method.is_read() {
                if let Some(hit) = self.cache.get(&key).await {
                    tracing::debug!(%key, "cache hit");
                    return Ok(hit);
                }
            }

            match self.locks.try_acquire(&key).await {
                LockAttempt::Acquired => {
                    return self
                        .perform(&key, endpoint_id, payload, method, auth_token)
                        .await;
                }
                LockAttempt::Busy(notify) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::warn!(%key, "gave up waiting on in-flight request");
                        return Err(ApiError::LockTimeout { key });
                    }
                    // Wake on release, or after the poll interval as a
                    // backstop for a notification registered too late.
                    let wait = (deadline - now).min(self.config.poll_interval);
                    tracing::debug!(%key, "identical request in flight, waiting");
                    let _ = tokio::time::timeout(wait, notify.notified()).await;
                    // Loop: a populated cache entry, a freed slot, or the
                    // deadline decides what happens next.
                }
            }
        }
    }

    /// Holder path: one network call, latency fed back as TTL, slot released
    /// on every exit.
    async fn perform(
        &self,
        key: &str,
        endpoint_id: &str,
        payload: &Value,
        method: Method,
        auth_token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let bearer = match auth_token {
            Some(token) => Some(token.to_string()),
            None => self.auth_token.read().await.clone(),
        };

        let started = Instant::now();
        let outcome = self
            .transport
            .send(method, endpoint_id, payload, bearer.as_deref())
            .await;
        let elapsed = started.elapsed();

        let outcome = match outcome {
            Ok(body) => {
                self.latency.record(key, elapsed).await;
                if method.is_read() {
                    let ttl = self.latency.current_ttl(key).await;
                    self.cache.put(key, body.clone(), ttl).await;
                }
                Ok(body)
            }
            Err(err) => {
                if err.is_session_expired() {
                    tracing::warn!(endpoint_id, "backend reports expired session");
                    if let Some(hook) = &self.on_session_expired {
                        hook();
                    }
                }
                Err(err)
            }
        };

        self.locks.release(key).await;
        outcome
    }

    /// Current TTL the cache would use for this fingerprint.
    pub async fn current_ttl(&self, key: &str) -> Duration {
        self.latency.current_ttl(key).await
    }

    /// Drop every cached response. Latency history is kept — it reflects the
    /// backend, not the cached data.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingTransport {
        code: Option<i64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FailingTransport {
        async fn send(
            &self,
            _method: Method,
            _endpoint_id: &str,
            _payload: &Value,
            _bearer_token: Option<&str>,
        ) -> Result<Value, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::Backend {
                code: self.code,
                message: "rejected".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_session_expiry_hook_fires_once_per_failure() {
        let transport = Arc::new(FailingTransport {
            code: Some(crate::error::SESSION_EXPIRED_CODE),
            calls: AtomicUsize::new(0),
        });
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let coordinator = RequestCoordinator::new(transport, CoordinatorConfig::default())
            .with_session_expired_hook(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));

        let err = coordinator
            .execute("getBalance", &json!({"user": "A"}), Method::Get, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(crate::error::SESSION_EXPIRED_CODE));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_backend_codes_pass_through_without_hook() {
        let transport = Arc::new(FailingTransport {
            code: Some(7),
            calls: AtomicUsize::new(0),
        });
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let coordinator = RequestCoordinator::new(transport, CoordinatorConfig::default())
            .with_session_expired_hook(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));

        let err = coordinator
            .execute("getBalance", &json!({"user": "A"}), Method::Get, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(7));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let transport = Arc::new(FailingTransport {
            code: None,
            calls: AtomicUsize::new(0),
        });
        let coordinator =
            RequestCoordinator::new(transport.clone(), CoordinatorConfig::default());

        for _ in 0..2 {
            let _ = coordinator
                .execute("getBalance", &json!({"user": "A"}), Method::Get, None)
                .await;
        }
        // Both calls reached the transport: no cache entry, and the first
        // failure released the slot for the second.
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}

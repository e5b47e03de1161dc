//! Adaptive request coordination: fingerprinting, in-flight dedup, and
//! latency-derived response caching.

pub mod cache;
pub mod coordinator;
pub mod fingerprint;
pub mod latency;
pub mod locks;

pub use cache::ResponseCache;
pub use coordinator::{CoordinatorConfig, RequestCoordinator, SessionExpiredHook};
pub use fingerprint::{canonical_json, fingerprint};
pub use latency::LatencyTracker;
pub use locks::{InFlightLockTable, LockAttempt};

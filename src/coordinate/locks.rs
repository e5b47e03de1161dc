//! Per-fingerprint in-flight registry.
//!
//! At most one network call per fingerprint may be in flight at any instant.
//! The first caller to acquire becomes the holder; everyone else gets the
//! holder's [`Notify`] handle and waits for release. The holder must release
//! on every exit path, success or failure, so no waiter is stranded behind a
//! dead request.

use async_lock::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

/// Outcome of an acquisition attempt.
pub enum LockAttempt {
    /// This caller owns the in-flight slot and must call
    /// [`InFlightLockTable::release`] when its request cycle completes.
    Acquired,
    /// Another caller is already executing this fingerprint; wait on the
    /// handle for its completion.
    Busy(Arc<Notify>),
}

/// Table of fingerprints with a request currently executing.
///
/// Entries exist only while a request is in flight; `release` removes the
/// entry and wakes all waiters, so the table stays small regardless of how
/// many distinct fingerprints the process has seen.
pub struct InFlightLockTable {
    in_flight: Mutex<HashMap<String, Arc<Notify>>>,
}

impl InFlightLockTable {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically claim the in-flight slot for `key`.
    ///
    /// Exactly one concurrent caller observes [`LockAttempt::Acquired`]; the
    /// check-and-set happens under the table mutex, so no two callers can
    /// interleave between check and insert.
    pub async fn try_acquire(&self, key: &str) -> LockAttempt {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(notify) = in_flight.get(key) {
            return LockAttempt::Busy(notify.clone());
        }
        in_flight.insert(key.to_string(), Arc::new(Notify::new()));
        LockAttempt::Acquired
    }

    /// Release the slot for `key` and wake all waiters.
    ///
    /// Called unconditionally by the holder when its cycle completes,
    /// whether the network call succeeded or failed.
    pub async fn release(&self, key: &str) {
        let notify = self.in_flight.lock().await.remove(key);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }

    #[cfg(test)]
    pub(crate) async fn is_held(&self, key: &str) -> bool {
        self.in_flight.lock().await.contains_key(key)
    }
}

impl Default for InFlightLockTable {
    fn default() -> Self {
        Self::new()
    }
}

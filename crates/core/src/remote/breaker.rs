//! Per-host failure cooldown
//!
//! When a store request fails, every endpoint on that host is off-limits for
//! the cooldown window. This protects a struggling store from retry storms
//! and keeps admin page loads from stalling on a dead host. State lives in
//! the key-value store; a duplicate failure recorded by racing callers just
//! re-extends the window, which is benign.

use crate::clock::Clock;
use crate::storage::{self, KeyValueStore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// How long a host stays off-limits after a failure.
pub const FAILURE_COOLDOWN: Duration = Duration::from_secs(60 * 60);

pub struct CircuitBreaker {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Stable key for a host. Derived from the normalized store URL so that
    /// every endpoint on a host shares one cooldown entry.
    pub fn host_key(api_url: &str) -> String {
        let hash = Sha256::digest(api_url.trim_end_matches('/').as_bytes());
        hash[..8].iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Whether a call to this host may proceed. An expired entry is cleared
    /// on read, so repeated calls after expiry stay cheap.
    pub fn should_attempt(&self, host_key: &str) -> bool {
        let option = storage::failed_request_key(host_key);
        let retry_after = match self.kv.get(&option).and_then(|v| v.trim().parse::<u64>().ok()) {
            Some(ts) => ts,
            // Absent or unreadable: never failed.
            None => return true,
        };

        if self.clock.now() >= retry_after {
            self.kv.delete(&option);
            return true;
        }
        false
    }

    /// Marks the host as failed for the default cooldown window.
    pub fn record_failure(&self, host_key: &str) {
        self.record_failure_for(host_key, FAILURE_COOLDOWN);
    }

    /// Marks the host as failed for a custom window, overwriting any prior
    /// entry.
    pub fn record_failure_for(&self, host_key: &str, cooldown: Duration) {
        let retry_after = self.clock.now() + cooldown.as_secs();
        self.kv
            .set(&storage::failed_request_key(host_key), &retry_after.to_string());
        tracing::warn!(host_key, retry_after, "remote request failed, cooling down host");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn breaker() -> (CircuitBreaker, Arc<MemoryStore>, Arc<ManualClock>) {
        let kv = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let breaker = CircuitBreaker::new(kv.clone(), clock.clone());
        (breaker, kv, clock)
    }

    #[test]
    fn host_key_is_stable_and_host_scoped() {
        let a = CircuitBreaker::host_key("https://store.example.com");
        let b = CircuitBreaker::host_key("https://store.example.com/");
        let c = CircuitBreaker::host_key("https://other.example.com");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn unknown_host_may_attempt() {
        let (breaker, _, _) = breaker();
        assert!(breaker.should_attempt("abcd"));
    }

    #[test]
    fn failure_blocks_until_cooldown_passes() {
        let (breaker, _, clock) = breaker();
        breaker.record_failure("abcd");
        assert!(!breaker.should_attempt("abcd"));

        // One second before expiry: still blocked.
        clock.advance(FAILURE_COOLDOWN.as_secs() - 1);
        assert!(!breaker.should_attempt("abcd"));

        clock.advance(1);
        assert!(breaker.should_attempt("abcd"));
        // Entry was cleared; asking again is still allowed.
        assert!(breaker.should_attempt("abcd"));
    }

    #[test]
    fn expired_entry_is_cleared_on_read(){
        let (breaker, kv, clock) = breaker();
        breaker.record_failure("abcd");
        clock.advance(FAILURE_COOLDOWN.as_secs());
        assert!(breaker.should_attempt("abcd"));
        assert!(kv.is_empty());
    }

    #[test]
    fn garbage_stored_value_reads_as_never_failed() {
        let (breaker, kv, _) = breaker();
        kv.set(&storage::failed_request_key("abcd"), "not-a-number");
        assert!(breaker.should_attempt("abcd"));
    }

    #[test]
    fn repeat_failure_extends_the_window() {
        let (breaker, _, clock) = breaker();
        breaker.record_failure("abcd");
        clock.advance(FAILURE_COOLDOWN.as_secs() - 10);
        breaker.record_failure("abcd");

        clock.advance(11);
        // Original window has passed, the re-recorded one has not.
        assert!(!breaker.should_attempt("abcd"));
    }
}

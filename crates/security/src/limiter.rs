//! Sliding-window rate limiter keyed by client IP.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Client tables larger than this are purged of stale entries on access.
const CLIENT_TABLE_PURGE_THRESHOLD: usize = 10_000;

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client IP. Old timestamps are discarded
/// lazily when a client is checked. Thread-safe via `std::sync::Mutex`
/// (non-async, held briefly).
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether a request from `client_ip` is admitted. Admitted
    /// requests record their timestamp; rejected requests do not.
    pub fn is_allowed(&self, client_ip: &str) -> bool {
        self.is_allowed_at(client_ip, Instant::now())
    }

    /// Clock-injected variant used by tests.
    pub fn is_allowed_at(&self, client_ip: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > CLIENT_TABLE_PURGE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, timestamps| {
                timestamps
                    .back()
                    .is_some_and(|t| now.duration_since(*t) < window)
            });
        }

        let timestamps = clients.entry(client_ip.to_string()).or_default();
        while timestamps
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            timestamps.pop_front();
        }

        if timestamps.len() >= self.max_requests {
            return false;
        }
        timestamps.push_back(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.is_allowed_at("10.0.0.1", now));
        assert!(limiter.is_allowed_at("10.0.0.1", now));
        assert!(!limiter.is_allowed_at("10.0.0.1", now));
    }

    #[test]
    fn window_expiry_readmits() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.is_allowed_at("10.0.0.1", now));
        assert!(!limiter.is_allowed_at("10.0.0.1", now + Duration::from_secs(30)));
        assert!(limiter.is_allowed_at("10.0.0.1", now + Duration::from_secs(61)));
    }

    #[test]
    fn clients_are_isolated() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.is_allowed_at("10.0.0.1", now));
        assert!(limiter.is_allowed_at("10.0.0.2", now));
        assert!(!limiter.is_allowed_at("10.0.0.1", now));
    }

    #[test]
    fn rejection_does_not_consume_a_slot() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.is_allowed_at("10.0.0.1", now));
        for _ in 0..5 {
            assert!(!limiter.is_allowed_at("10.0.0.1", now + Duration::from_secs(1)));
        }
        // The single recorded timestamp expires; rejections left no residue.
        assert!(limiter.is_allowed_at("10.0.0.1", now + Duration::from_secs(61)));
    }
}

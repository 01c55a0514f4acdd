//! Fixed-window rate limiter for credential endpoints.
//!
//! Owned by `AppState` and injected into handlers rather than living in a
//! process global. Keys are real client identities (the login email,
//! lowercased). Storage is bounded: when the map exceeds capacity, expired
//! windows are swept; if everything is live, the oldest window is evicted.
//!
//! Time is passed in by the caller so tests can drive the clock.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Window {
    started: Instant,
    count: u32,
}

pub struct FixedWindowLimiter {
    window: Duration,
    max_per_window: u32,
    capacity: usize,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_per_window: u32, capacity: usize) -> Self {
        FixedWindowLimiter {
            window,
            max_per_window,
            capacity: capacity.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Sensible defaults for login throttling: 10 attempts per minute per
    /// identity, at most 10k tracked identities.
    pub fn for_login() -> Self {
        FixedWindowLimiter::new(Duration::from_secs(60), 10, 10_000)
    }

    /// Record an attempt for `key` at time `now`. Returns false when the
    /// key's current window is exhausted.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(w) = windows.get_mut(key) {
            if now.duration_since(w.started) >= self.window {
                w.started = now;
                w.count = 1;
                return true;
            }
            if w.count >= self.max_per_window {
                return false;
            }
            w.count += 1;
            return true;
        }

        if windows.len() >= self.capacity {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
            if windows.len() >= self.capacity {
                // All windows still live; drop the oldest one.
                if let Some(oldest) = windows
                    .iter()
                    .min_by_key(|(_, w)| w.started)
                    .map(|(k, _)| k.clone())
                {
                    windows.remove(&oldest);
                }
            }
        }

        windows.insert(
            key.to_string(),
            Window {
                started: now,
                count: 1,
            },
        );
        true
    }

    /// Record an attempt for `key` now.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Number of currently tracked identities.
    pub fn tracked(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_blocks() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 3, 100);
        let t0 = Instant::now();
        assert!(limiter.check_at("a@example.com", t0));
        assert!(limiter.check_at("a@example.com", t0));
        assert!(limiter.check_at("a@example.com", t0));
        assert!(!limiter.check_at("a@example.com", t0));
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 1, 100);
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        assert!(!limiter.check_at("a", t0 + Duration::from_secs(59)));
        assert!(limiter.check_at("a", t0 + Duration::from_secs(60)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 1, 100);
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        assert!(limiter.check_at("b", t0));
        assert!(!limiter.check_at("a", t0));
    }

    #[test]
    fn capacity_sweeps_expired_windows() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 5, 2);
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        assert!(limiter.check_at("b", t0));
        // Both windows expired; inserting a third sweeps them out.
        let later = t0 + Duration::from_secs(120);
        assert!(limiter.check_at("c", later));
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn capacity_evicts_oldest_live_window() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(600), 5, 2);
        let t0 = Instant::now();
        assert!(limiter.check_at("old", t0));
        assert!(limiter.check_at("mid", t0 + Duration::from_secs(1)));
        assert!(limiter.check_at("new", t0 + Duration::from_secs(2)));
        assert_eq!(limiter.tracked(), 2);
        // "old" was evicted, so it gets a fresh window.
        assert!(limiter.check_at("old", t0 + Duration::from_secs(3)));
    }
}

//! Per-route throttle for optimization requests.
//!
//! Fixed windows: the first request for a route opens a window, and at most
//! `max_requests` are admitted until it ends. In-memory only, so limits
//! reset on restart. Share via `Arc<RateLimiter>`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    count: usize,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<Uuid, Window>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Returns `true` and counts the request if `key` is under its limit
    pub fn check_and_record(&self, key: Uuid) -> bool {
        self.check_and_record_at(key, Instant::now())
    }

    fn check_and_record_at(&self, key: Uuid, now: Instant) -> bool {
        let mut windows = self.windows.lock();

        let entry = windows.entry(key).or_insert(Window {
            opened_at: now,
            count: 0,
        });
        if now.duration_since(entry.opened_at) >= self.window {
            *entry = Window {
                opened_at: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Drop expired windows (call periodically to free memory)
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&self, now: Instant) {
        let window = self.window;
        self.windows
            .lock()
            .retain(|_, entry| now.duration_since(entry.opened_at) < window);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_within_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let route = Uuid::new_v4();
        assert!(limiter.check_and_record(route));
        assert!(limiter.check_and_record(route));
        assert!(limiter.check_and_record(route));
    }

    #[test]
    fn blocks_over_limit() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let route = Uuid::new_v4();
        limiter.check_and_record(route);
        limiter.check_and_record(route);
        assert!(!limiter.check_and_record(route));
    }

    #[test]
    fn routes_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(limiter.check_and_record(a));
        assert!(!limiter.check_and_record(a));
        assert!(limiter.check_and_record(b));
    }

    #[test]
    fn window_expiry_resets_count() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let route = Uuid::new_v4();
        let start = Instant::now();

        assert!(limiter.check_and_record_at(route, start));
        assert!(!limiter.check_and_record_at(route, start + Duration::from_secs(59)));
        assert!(limiter.check_and_record_at(route, start + Duration::from_secs(60)));
    }

    #[test]
    fn cleanup_drops_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();
        limiter.check_and_record_at(Uuid::new_v4(), start);
        limiter.check_and_record_at(Uuid::new_v4(), start + Duration::from_secs(30));
        assert_eq!(limiter.tracked_keys(), 2);

        limiter.cleanup_at(start + Duration::from_secs(61));
        assert_eq!(limiter.tracked_keys(), 1);
    }
}

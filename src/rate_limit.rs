use dashmap::DashMap;
use std::time::{Duration, Instant};

// Rate limit entry - tracks requests per key
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

// Fixed-window limiter shared across requests
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    limit: u32,       // max requests allowed
    window: Duration, // duration of one window
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    // true if `key` may make another request now
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        // window expired..? reset it
        if entry.window_start.elapsed() > self.window {
            entry.count = 1;
            entry.window_start = now;
            return true;
        }

        if entry.count < self.limit {
            entry.count += 1;
            return true;
        }

        false
    }
}

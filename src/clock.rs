use std::sync::atomic::{AtomicI64, Ordering};

pub const SECONDS_PER_INDEX: i64 = 3600;

// 2025-07-22T13:00:00Z
pub const DEFAULT_EPOCH: i64 = 1_753_189_200;

// Source of wall-clock time in Unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

// Settable clock for tests
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::Relaxed);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::Relaxed);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::Relaxed)
    }
}

// Hour index counted from an epoch, plus the countdown to the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourIndex {
    pub index: u64,
    pub seconds_until_next: u64, // in [0, 3600), 0 at the second the index ticks
}

impl HourIndex {
    // None before the epoch
    pub fn derive(now: i64, epoch: i64) -> Option<Self> {
        let elapsed = now - epoch;
        let index = elapsed.div_euclid(SECONDS_PER_INDEX) + 1;
        if index < 1 {
            return None;
        }
        let into_hour = elapsed.rem_euclid(SECONDS_PER_INDEX);
        let seconds_until_next = (SECONDS_PER_INDEX - into_hour) % SECONDS_PER_INDEX;

        Some(Self {
            index: index as u64,
            seconds_until_next: seconds_until_next as u64,
        })
    }
}

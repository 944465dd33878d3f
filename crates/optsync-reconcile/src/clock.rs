//! Time sources for freshness markers

use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time in Unix milliseconds
pub trait Clock: Send + Sync + Debug {
    /// Current time in milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for deterministic tests
#[derive(Debug, Default)]
pub struct FixedClock(AtomicI64);

impl FixedClock {
    /// Clock frozen at `millis`
    #[inline]
    #[must_use]
    pub fn at(millis: i64) -> Self {
        Self(AtomicI64::new(millis))
    }

    /// Move the clock to `millis`
    #[inline]
    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    #[inline]
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

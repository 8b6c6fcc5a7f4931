//! # Time Sources
//!
//! `SystemClock` for production, `FixedClock` for deterministic tests and for
//! replaying captured launches from the operator CLI.

use crate::ports::outbound::TimeSource;
use std::sync::atomic::{AtomicI64, Ordering};

/// Production time source using the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};

        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
    }
}

/// Settable time source.
///
/// ```rust
/// use lti_launch_auth::{FixedClock, TimeSource};
///
/// let clock = FixedClock::new(12345);
/// clock.advance(5);
/// assert_eq!(clock.now(), 12350);
/// ```
#[derive(Debug, Default)]
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
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

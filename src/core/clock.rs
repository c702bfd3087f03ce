//! Wall-clock source for liveness timestamps.

use std::sync::Mutex;

use time::{Duration, OffsetDateTime};

use crate::runtime::lock_unpoisoned;

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Hand-driven clock for deterministic tests and replays.
///
/// It may be moved backwards, which is how callers exercise the
/// non-decreasing timestamp guarantee of the connectivity signal.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *lock_unpoisoned(&self.now) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock_unpoisoned(&self.now);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *lock_unpoisoned(&self.now)
    }
}

//! # Time Sources
//!
//! Every unlock comparison in the ledger goes through a [`Clock`], so tests,
//! benchmarks, and the demo can run months of vault lifecycle in
//! microseconds. Production wiring uses [`SystemClock`]; everything else uses
//! [`ManualClock`] and advances it explicitly.
//!
//! Clocks never rewind. [`ManualClock::advance`] ignores backwards moves
//! rather than erroring, so a shared clock handle cannot be talked into time
//! travel.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// A source of current time.
///
/// Implementations must be monotonic: successive `now()` calls never move
/// backwards.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time via [`chrono::Utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// A virtual clock that only moves when told to.
///
/// The workhorse of the test suites: create a registry on a `ManualClock`,
/// run the early-withdrawal rejections, advance 30 days, run the happy path.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Creates a clock frozen at the current wall-clock instant.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Moves the clock forward by `delta`. Backwards or zero deltas are
    /// ignored; the clock never rewinds.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.write();
        let target = *now + delta;
        if target > *now {
            *now = target;
        }
    }

    /// Moves the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }

    /// Moves the clock forward by seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

//! 32-bit wrapping millisecond ticks.
//!
//! Every comparison here is modular: a tick counter this small wraps in a
//! little under 50 days of uptime, so "less than" has to be interpreted as
//! "earlier on the cyclic number line", not as plain integer ordering.

use std::time::Instant;

/// An absolute point in time, expressed as a wrapping 32-bit millisecond
/// counter. Comparisons between two `Tick`s are only meaningful for values
/// that are known to be within half a wrap of each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tick(pub u32);

impl Tick {
    /// Sentinel meaning "never". A task whose `expire` is `ETERNITY` is not
    /// inserted into the wait queue.
    pub const ETERNITY: Tick = Tick(u32::MAX);

    pub fn new(ms: u32) -> Self {
        Tick(ms)
    }

    /// `true` unless this tick is the eternity sentinel.
    pub fn is_set(self) -> bool {
        self != Self::ETERNITY
    }

    /// Modular "is earlier than": `a < b` iff `(a - b)` interpreted as
    /// signed 32-bit is negative.
    pub fn is_lt(self, other: Tick) -> bool {
        (self.0.wrapping_sub(other.0) as i32) < 0
    }

    pub fn is_le(self, other: Tick) -> bool {
        self == other || self.is_lt(other)
    }

    /// Whether this tick has already passed relative to `now`, treating the
    /// eternity sentinel as never-expired.
    pub fn is_expired(self, now: Tick) -> bool {
        self.is_set() && self.is_le(now)
    }
}

/// Supplies `now_ms` to the scheduler. The scheduler never reads the wall
/// clock directly — it asks its `Clock`, so tests can drive a fake one and
/// the demo binary can drive a real one off a single shared `Instant`.
pub trait Clock {
    fn now(&self) -> Tick;
}

/// Default `Clock` backed by `std::time::Instant`, truncated into a 32-bit
/// millisecond counter the same way the source's tick source wraps the OS
/// monotonic clock.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Tick {
        let ms = self.epoch.elapsed().as_millis() as u64;
        Tick((ms & u32::MAX as u64) as u32)
    }
}

/// A clock that only advances when told to. Used by tests and by the
/// end-to-end scenarios below, which step time explicitly rather than
/// sleeping real wall-clock milliseconds.
#[derive(Default)]
pub struct ManualClock {
    now: std::cell::Cell<u32>,
}

impl ManualClock {
    pub fn new(start: u32) -> Self {
        Self {
            now: std::cell::Cell::new(start),
        }
    }

    pub fn advance(&self, delta_ms: u32) {
        self.now.set(self.now.get().wrapping_add(delta_ms));
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        Tick(self.now.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eternity_is_never_expired() {
        assert!(!Tick::ETERNITY.is_expired(Tick(0)));
        assert!(!Tick::ETERNITY.is_set());
    }

    #[test]
    fn wraparound_ordering() {
        let near_max = Tick(u32::MAX - 5);
        let wrapped = Tick(5);
        assert!(near_max.is_lt(wrapped));
        assert!(!wrapped.is_lt(near_max));
    }

    #[test]
    fn expiry_is_inclusive() {
        let t = Tick(100);
        assert!(t.is_expired(Tick(100)));
        assert!(t.is_expired(Tick(101)));
        assert!(!t.is_expired(Tick(99)));
    }
}

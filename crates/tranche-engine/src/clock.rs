//! Schedule clocks.
//!
//! The engine never reads wall-clock time itself: every operation takes
//! `now` as an argument. These clocks are for callers that need to produce
//! that argument. [`MonotonicClock`] clamps a source that may step
//! backwards (NTP corrections, skewed hosts), so a caller never hands the
//! engine a time earlier than one it already used.

use std::cell::Cell;

use tranche_types::{TimeSpan, UnixTime};

/// Source of schedule time, in seconds.
pub trait Clock {
    fn now(&self) -> UnixTime;
}

/// UTC wall-clock seconds. Pre-epoch readings clamp to zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixTime {
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Manually driven clock for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<UnixTime>,
}

impl ManualClock {
    #[must_use]
    pub fn at(now: UnixTime) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: UnixTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: TimeSpan) {
        self.now.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixTime {
        self.now.get()
    }
}

/// Wraps a clock so readings never decrease.
#[derive(Debug, Default)]
pub struct MonotonicClock<C> {
    inner: C,
    high_water: Cell<UnixTime>,
}

impl<C: Clock> MonotonicClock<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            high_water: Cell::new(0),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Clock> Clock for MonotonicClock<C> {
    fn now(&self) -> UnixTime {
        let raw = self.inner.now();
        let last = self.high_water.get();
        if raw < last {
            tracing::warn!(raw, clamped_to = last, "Clock went backwards; clamping");
            return last;
        }
        self.high_water.set(raw);
        raw
    }
}

/// Clamp `now` to the last instant an escrow committed at.
///
/// Returns the effective time and whether it was clamped.
#[must_use]
pub fn clamp_to(last_seen: Option<UnixTime>, now: UnixTime) -> (UnixTime, bool) {
    match last_seen {
        Some(last) if now < last => (last, true),
        _ => (now, false),
    }
}

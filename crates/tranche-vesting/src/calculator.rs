//! Vesting calculator — a pure function of `(schedule, now)`.
//!
//! ```text
//! vested_share      = floor(total * pct / 100)
//! settlement_share  = total - vested_share
//! span              = total_duration + dispute_extension
//! elapsed           = clamp(now - start, 0, span)
//! intervals_elapsed = floor(elapsed / interval)
//! intervals_total   = floor(span / interval)
//! vested_to_date    = floor(vested_share * intervals_elapsed / intervals_total)
//! ```
//!
//! Vesting is a step function: nothing accrues inside an interval until it
//! completes, including a partial final interval left by an extension that
//! is not interval-aligned. Nothing here is cached; every query and claim
//! recomputes from the current extension and `now`.

use serde::{Deserialize, Serialize};
use tranche_types::{Amount, EscrowTerms, TimeSpan, UnixTime};

use crate::rounding::{fraction_of, percent_of};

/// The inputs the calculator reads from an escrow ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub total_amount: Amount,
    pub vested_percentage: u8,
    pub total_duration: TimeSpan,
    pub interval: TimeSpan,
    /// `None` until the escrow is funded.
    pub start_time: Option<UnixTime>,
    pub dispute_extension: TimeSpan,
}

impl VestingSchedule {
    /// Unstarted schedule for the given terms.
    #[must_use]
    pub fn from_terms(terms: &EscrowTerms) -> Self {
        Self {
            total_amount: terms.total_amount,
            vested_percentage: terms.vested_percentage,
            total_duration: terms.total_duration,
            interval: terms.interval,
            start_time: None,
            dispute_extension: 0,
        }
    }

    #[must_use]
    pub fn started_at(mut self, start: UnixTime) -> Self {
        self.start_time = Some(start);
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: TimeSpan) -> Self {
        self.dispute_extension = extension;
        self
    }

    /// `total_duration + dispute_extension`, saturating.
    #[must_use]
    pub fn span(&self) -> TimeSpan {
        self.total_duration.saturating_add(self.dispute_extension)
    }

    /// `start + total_duration + dispute_extension`; `None` before funding.
    #[must_use]
    pub fn effective_end(&self) -> Option<UnixTime> {
        self.start_time.map(|s| s.saturating_add(self.span()))
    }

    /// `start + total_duration`; `None` before funding.
    #[must_use]
    pub fn original_end(&self) -> Option<UnixTime> {
        self.start_time
            .map(|s| s.saturating_add(self.total_duration))
    }

    #[must_use]
    pub fn vested_share(&self) -> Amount {
        vested_share(self.total_amount, self.vested_percentage)
    }

    #[must_use]
    pub fn settlement_share(&self) -> Amount {
        settlement_share(self.total_amount, self.vested_percentage)
    }
}

/// Every intermediate of one vesting computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSnapshot {
    pub now: UnixTime,
    pub vested_share: Amount,
    pub settlement_share: Amount,
    pub elapsed: TimeSpan,
    pub intervals_elapsed: u64,
    pub intervals_total: u64,
    pub provider_vested_to_date: Amount,
}

impl VestingSnapshot {
    /// Whether every interval of the (extended) schedule has elapsed.
    #[must_use]
    pub fn fully_vested(&self) -> bool {
        self.intervals_total > 0 && self.intervals_elapsed >= self.intervals_total
    }
}

/// Share that vests over time: `floor(total * pct / 100)`.
#[must_use]
pub fn vested_share(total: Amount, vested_percentage: u8) -> Amount {
    percent_of(total, vested_percentage)
}

/// Share gated on completion: the total minus the vested share, so the
/// rounding remainder always lands here.
#[must_use]
pub fn settlement_share(total: Amount, vested_percentage: u8) -> Amount {
    total.saturating_sub(vested_share(total, vested_percentage))
}

/// Compute the full vesting breakdown at `now`.
///
/// Before funding (no start time) nothing has elapsed and nothing is
/// vested. `now` earlier than the start counts as zero elapsed time.
#[must_use]
pub fn snapshot(schedule: &VestingSchedule, now: UnixTime) -> VestingSnapshot {
    let vested = schedule.vested_share();
    let span = schedule.span();
    let intervals_total = span.checked_div(schedule.interval).unwrap_or(0);

    let elapsed = schedule
        .start_time
        .map_or(0, |start| now.saturating_sub(start).min(span));
    let intervals_elapsed = elapsed
        .checked_div(schedule.interval)
        .unwrap_or(0)
        .min(intervals_total);

    // Capped at the vested share once every interval has elapsed.
    let provider_vested_to_date = if intervals_total > 0 && intervals_elapsed >= intervals_total {
        vested
    } else {
        fraction_of(vested, intervals_elapsed, intervals_total)
    };

    tracing::trace!(
        now,
        elapsed,
        intervals_elapsed,
        intervals_total,
        vested_to_date = %provider_vested_to_date,
        "Vesting snapshot"
    );

    VestingSnapshot {
        now,
        vested_share: vested,
        settlement_share: schedule.settlement_share(),
        elapsed,
        intervals_elapsed,
        intervals_total,
        provider_vested_to_date,
    }
}

/// Time-vested amount owed to the provider at `now` (claimed or not).
#[must_use]
pub fn provider_vested_to_date(schedule: &VestingSchedule, now: UnixTime) -> Amount {
    snapshot(schedule, now).provider_vested_to_date
}

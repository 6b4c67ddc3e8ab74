//! Per-interval schedule table.
//!
//! Lists the cumulative vested amount at each interval boundary of a
//! (possibly extended) schedule. Each row is produced by the calculator
//! itself, so the table can never disagree with a live query.

use serde::{Deserialize, Serialize};
use tranche_types::{Amount, TimeSpan, constants};

use crate::calculator::{VestingSchedule, snapshot};

/// One step of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// 1-based interval number.
    pub step: u64,
    /// Offset from the start time at which this step vests.
    pub offset: TimeSpan,
    /// Amount that vests at this step.
    pub increment: Amount,
    /// Cumulative vested amount after this step.
    pub cumulative: Amount,
}

/// Number of whole intervals in `schedule`'s span.
#[must_use]
pub fn step_count(schedule: &VestingSchedule) -> u64 {
    schedule.span().checked_div(schedule.interval).unwrap_or(0)
}

/// Rows for every whole interval of `schedule`'s span, relative to its
/// start (an unstarted schedule is tabulated as if it started at 0).
///
/// At most [`constants::MAX_SCHEDULE_ROWS`] rows are produced; callers that
/// need the full table should check [`step_count`] first.
#[must_use]
pub fn schedule_table(schedule: &VestingSchedule) -> Vec<ScheduleRow> {
    let anchored = schedule.started_at(schedule.start_time.unwrap_or(0));
    let start = anchored.start_time.unwrap_or(0);
    let steps = step_count(&anchored).min(constants::MAX_SCHEDULE_ROWS);

    let mut rows = Vec::with_capacity(usize::try_from(steps).unwrap_or_default());
    let mut previous = Amount::ZERO;
    for step in 1..=steps {
        let offset = step.saturating_mul(anchored.interval);
        let cumulative = snapshot(&anchored, start.saturating_add(offset)).provider_vested_to_date;
        rows.push(ScheduleRow {
            step,
            offset,
            increment: cumulative.saturating_sub(previous),
            cumulative,
        });
        previous = cumulative;
    }
    rows
}

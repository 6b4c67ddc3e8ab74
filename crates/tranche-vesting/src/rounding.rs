//! The one rounding policy: always round **down**.
//!
//! Every proportional amount in Tranche (the vested share of the total, the
//! vested-to-date fraction of the vested share) goes through
//! [`fraction_of`]. Whatever the floor drops stays with the settlement
//! share, so the time-vested side can never exceed its configured
//! percentage and two computations of the same quantity cannot disagree.

use tranche_types::{Amount, constants::PERCENT_DENOMINATOR};

/// `floor(value * num / den)` without overflowing.
///
/// `num` is clamped to `den`, so the result never exceeds `value`.
/// A zero denominator yields zero.
///
/// Split as `value = q * den + r`:
/// `floor(value * num / den) = q * num + floor(r * num / den)`, and with
/// `num <= den <= u64::MAX` neither product can overflow a `u128`.
#[must_use]
pub fn fraction_of(value: Amount, num: u64, den: u64) -> Amount {
    if den == 0 {
        return Amount::ZERO;
    }
    let num = u128::from(num.min(den));
    let den = u128::from(den);
    let q = value.units() / den;
    let r = value.units() % den;
    Amount::new(q * num + r * num / den)
}

/// `floor(value * percent / 100)`.
#[must_use]
pub fn percent_of(value: Amount, percent: u8) -> Amount {
    // PERCENT_DENOMINATOR is 100; the cast cannot truncate.
    #[allow(clippy::cast_possible_truncation)]
    let den = PERCENT_DENOMINATOR as u64;
    fraction_of(value, u64::from(percent), den)
}

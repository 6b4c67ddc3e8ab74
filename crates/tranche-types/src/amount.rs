//! Currency amounts and schedule time units.
//!
//! Amounts are whole numbers of the smallest currency unit (wei for an
//! 18-decimal token). All arithmetic on them is checked; the engine never
//! wraps or saturates a balance.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, TrancheError};

/// Instant on the schedule clock, in seconds.
pub type UnixTime = u64;

/// Length of a schedule span, in seconds.
pub type TimeSpan = u64;

/// A non-negative amount in the smallest currency unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    #[must_use]
    pub const fn units(self) -> u128 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// # Errors
    /// Returns [`TrancheError::ArithmeticOverflow`] if the sum exceeds `u128`.
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| TrancheError::ArithmeticOverflow {
                context: format!("{self} + {rhs}"),
            })
    }

    /// # Errors
    /// Returns [`TrancheError::ArithmeticOverflow`] if `rhs > self`.
    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| TrancheError::ArithmeticOverflow {
                context: format!("{self} - {rhs}"),
            })
    }

    /// Subtraction clamped at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Human-readable value in major units (e.g. `decimals = 18` turns wei
    /// into ETH).
    ///
    /// Returns `None` when the amount does not fit a `Decimal` mantissa
    /// (96 bits) or `decimals` exceeds the supported scale (28).
    #[must_use]
    pub fn to_major_units(self, decimals: u32) -> Option<Decimal> {
        let units = i128::try_from(self.0).ok()?;
        Decimal::try_from_i128_with_scale(units, decimals)
            .ok()
            .map(|d| d.normalize())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u128> for Amount {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(u128::from(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero() {
        assert!(Amount::default().is_zero());
        assert_eq!(Amount::default(), Amount::ZERO);
    }

    #[test]
    fn checked_add_overflows() {
        let err = Amount(u128::MAX).checked_add(Amount(1)).unwrap_err();
        assert!(matches!(err, TrancheError::ArithmeticOverflow { .. }));
        assert_eq!(Amount(2).checked_add(Amount(3)).unwrap(), Amount(5));
    }

    #[test]
    fn checked_sub_underflows() {
        assert!(Amount(2).checked_sub(Amount(3)).is_err());
        assert_eq!(Amount(5).checked_sub(Amount(3)).unwrap(), Amount(2));
        assert_eq!(Amount(2).saturating_sub(Amount(3)), Amount::ZERO);
    }

    #[test]
    fn wei_to_ether() {
        let one_eth = Amount(1_000_000_000_000_000_000);
        assert_eq!(one_eth.to_major_units(18), Some(Decimal::ONE));

        let half = Amount(500_000_000_000_000_000);
        assert_eq!(half.to_major_units(18), Some(Decimal::new(5, 1)));
    }

    #[test]
    fn major_units_out_of_range() {
        assert_eq!(Amount(u128::MAX).to_major_units(18), None);
        assert_eq!(Amount(1).to_major_units(40), None);
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&Amount(42)).unwrap();
        assert_eq!(json, "42");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount(42));
    }
}

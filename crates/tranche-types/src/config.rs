//! Escrow terms: the construction parameters of one escrow.
//!
//! Terms are immutable once an escrow exists. [`EscrowTerms::validate`] is
//! the single gate every construction path goes through.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Amount, PartyId, Result, TimeSpan, TrancheError, constants};

/// Who may clear a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "party", rename_all = "snake_case")]
pub enum DisputeResolution {
    /// Only the client resolves disputes.
    #[default]
    ClientOnly,
    /// Only a neutral third party resolves disputes.
    Arbitrator(PartyId),
    /// Either the client or the named arbitrator.
    ClientOrArbitrator(PartyId),
}

impl DisputeResolution {
    /// Is `caller` allowed to resolve a dispute for an escrow whose client
    /// is `client`?
    #[must_use]
    pub fn permits(&self, caller: PartyId, client: PartyId) -> bool {
        match *self {
            Self::ClientOnly => caller == client,
            Self::Arbitrator(arbiter) => caller == arbiter,
            Self::ClientOrArbitrator(arbiter) => caller == client || caller == arbiter,
        }
    }
}

/// Construction parameters of one escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTerms {
    /// Party that funds the escrow and approves completion.
    pub client: PartyId,
    /// Party that receives vested and settlement payouts.
    pub service_provider: PartyId,
    /// Total locked amount in the smallest currency unit. Must be > 0.
    pub total_amount: Amount,
    /// Share released over time, 0–90 inclusive.
    pub vested_percentage: u8,
    /// Schedule length in seconds. Must be an exact multiple of `interval`.
    pub total_duration: TimeSpan,
    /// Vesting step in seconds. Must be > 0.
    pub interval: TimeSpan,
    /// Who may clear disputes.
    #[serde(default)]
    pub dispute_resolution: DisputeResolution,
}

impl EscrowTerms {
    /// Terms with client-only dispute resolution.
    #[must_use]
    pub fn new(
        client: PartyId,
        service_provider: PartyId,
        total_amount: Amount,
        vested_percentage: u8,
        total_duration: TimeSpan,
        interval: TimeSpan,
    ) -> Self {
        Self {
            client,
            service_provider,
            total_amount,
            vested_percentage,
            total_duration,
            interval,
            dispute_resolution: DisputeResolution::default(),
        }
    }

    /// Terms from minute-granular durations, as the deployment form takes
    /// them. Durations are stored in seconds.
    ///
    /// # Errors
    /// Returns [`TrancheError::ArithmeticOverflow`] if a duration overflows
    /// when converted to seconds.
    pub fn from_minutes(
        client: PartyId,
        service_provider: PartyId,
        total_amount: Amount,
        vested_percentage: u8,
        total_minutes: u64,
        interval_minutes: u64,
    ) -> Result<Self> {
        let to_secs = |minutes: u64| {
            minutes
                .checked_mul(constants::SECONDS_PER_MINUTE)
                .ok_or_else(|| TrancheError::ArithmeticOverflow {
                    context: format!("{minutes} minutes in seconds"),
                })
        };
        Ok(Self::new(
            client,
            service_provider,
            total_amount,
            vested_percentage,
            to_secs(total_minutes)?,
            to_secs(interval_minutes)?,
        ))
    }

    /// Replace the dispute resolution policy.
    #[must_use]
    pub fn with_dispute_resolution(mut self, policy: DisputeResolution) -> Self {
        self.dispute_resolution = policy;
        self
    }

    /// Check every construction rule.
    ///
    /// # Errors
    /// Returns [`TrancheError::InvalidConfiguration`] naming the first
    /// violated rule.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(TrancheError::InvalidConfiguration { reason });

        if self.total_amount.is_zero() {
            return invalid("total amount must be > 0".into());
        }
        if self.vested_percentage > constants::MAX_VESTED_PERCENTAGE {
            return invalid(format!(
                "vested percentage {} exceeds {}",
                self.vested_percentage,
                constants::MAX_VESTED_PERCENTAGE
            ));
        }
        if self.interval == 0 {
            return invalid("interval must be > 0".into());
        }
        if self.total_duration == 0 {
            return invalid("total duration must be > 0".into());
        }
        if self.total_duration % self.interval != 0 {
            return invalid(format!(
                "total duration {} is not a multiple of interval {}",
                self.total_duration, self.interval
            ));
        }
        if self.client == self.service_provider {
            return invalid("client and service provider must differ".into());
        }
        Ok(())
    }

    /// Number of vesting steps in the unextended schedule.
    #[must_use]
    pub fn interval_count(&self) -> u64 {
        self.total_duration.checked_div(self.interval).unwrap_or(0)
    }

    /// Parse terms from JSON and validate them.
    ///
    /// # Errors
    /// Returns [`TrancheError::Serialization`] on malformed JSON, or
    /// [`TrancheError::InvalidConfiguration`] on invalid terms.
    pub fn from_json(json: &str) -> Result<Self> {
        let terms: Self = serde_json::from_str(json)?;
        terms.validate()?;
        Ok(terms)
    }

    /// Read, parse and validate terms from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Fixture terms for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl EscrowTerms {
    /// 1,000,000 units, 70% vested over 60s in 10s steps, fresh parties.
    pub fn sample() -> Self {
        Self::new(
            PartyId::random(),
            PartyId::random(),
            Amount(1_000_000),
            70,
            60,
            10,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_terms_are_valid() {
        let terms = EscrowTerms::sample();
        assert!(terms.validate().is_ok());
        assert_eq!(terms.interval_count(), 6);
    }

    #[test]
    fn interval_must_divide_duration() {
        let mut terms = EscrowTerms::sample();
        terms.interval = 7;
        let err = terms.validate().unwrap_err();
        assert!(matches!(err, TrancheError::InvalidConfiguration { .. }));
    }

    #[test]
    fn percentage_bounds() {
        let mut terms = EscrowTerms::sample();
        terms.vested_percentage = 90;
        assert!(terms.validate().is_ok());
        terms.vested_percentage = 0;
        assert!(terms.validate().is_ok());
        terms.vested_percentage = 91;
        assert!(terms.validate().is_err());
    }

    #[test]
    fn zero_amount_and_zero_interval_rejected() {
        let mut terms = EscrowTerms::sample();
        terms.total_amount = Amount::ZERO;
        assert!(terms.validate().is_err());

        let mut terms = EscrowTerms::sample();
        terms.interval = 0;
        assert!(terms.validate().is_err());
        assert_eq!(terms.interval_count(), 0);

        let mut terms = EscrowTerms::sample();
        terms.total_duration = 0;
        assert!(terms.validate().is_err());
    }

    #[test]
    fn same_party_rejected() {
        let mut terms = EscrowTerms::sample();
        terms.service_provider = terms.client;
        assert!(terms.validate().is_err());
    }

    #[test]
    fn from_minutes_converts_to_seconds() {
        let terms = EscrowTerms::from_minutes(
            PartyId::random(),
            PartyId::random(),
            Amount(1),
            70,
            60,
            2,
        )
        .unwrap();
        assert_eq!(terms.total_duration, 3600);
        assert_eq!(terms.interval, 120);
        assert_eq!(terms.interval_count(), 30);

        let err = EscrowTerms::from_minutes(
            PartyId::random(),
            PartyId::random(),
            Amount(1),
            70,
            u64::MAX,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, TrancheError::ArithmeticOverflow { .. }));
    }

    #[test]
    fn resolution_policies() {
        let client = PartyId([1u8; 20]);
        let provider = PartyId([2u8; 20]);
        let arbiter = PartyId([3u8; 20]);

        assert!(DisputeResolution::ClientOnly.permits(client, client));
        assert!(!DisputeResolution::ClientOnly.permits(provider, client));

        let arb = DisputeResolution::Arbitrator(arbiter);
        assert!(arb.permits(arbiter, client));
        assert!(!arb.permits(client, client));

        let either = DisputeResolution::ClientOrArbitrator(arbiter);
        assert!(either.permits(arbiter, client));
        assert!(either.permits(client, client));
        assert!(!either.permits(provider, client));
    }

    #[test]
    fn from_json_defaults_to_client_only() {
        let json = r#"{
            "client": "0x1111111111111111111111111111111111111111",
            "service_provider": "0x2222222222222222222222222222222222222222",
            "total_amount": 1000000,
            "vested_percentage": 70,
            "total_duration": 60,
            "interval": 10
        }"#;
        let terms = EscrowTerms::from_json(json).unwrap();
        assert_eq!(terms.dispute_resolution, DisputeResolution::ClientOnly);
        assert_eq!(terms.total_amount, Amount(1_000_000));
    }

    #[test]
    fn from_json_validates() {
        let json = r#"{
            "client": "0x1111111111111111111111111111111111111111",
            "service_provider": "0x2222222222222222222222222222222222222222",
            "total_amount": 1000000,
            "vested_percentage": 70,
            "total_duration": 60,
            "interval": 7
        }"#;
        let err = EscrowTerms::from_json(json).unwrap_err();
        assert!(matches!(err, TrancheError::InvalidConfiguration { .. }));

        let err = EscrowTerms::from_json("{").unwrap_err();
        assert!(matches!(err, TrancheError::Serialization(_)));
    }

    #[test]
    fn arbitrator_policy_serde_roundtrip() {
        let terms = EscrowTerms::sample()
            .with_dispute_resolution(DisputeResolution::Arbitrator(PartyId([9u8; 20])));
        let json = serde_json::to_string(&terms).unwrap();
        let back: EscrowTerms = serde_json::from_str(&json).unwrap();
        assert_eq!(terms, back);
    }
}

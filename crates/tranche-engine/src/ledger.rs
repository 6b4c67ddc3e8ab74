//! Escrow ledger — the authoritative record of one escrow.
//!
//! Holds the immutable terms plus everything that changes over the escrow's
//! life: start time, dispute extension, status, flags and the cumulative
//! payouts to each party. Fields are private; the settlement controller is
//! the only writer, and it mutates a staged copy that must pass
//! [`EscrowLedger::audit`] before it replaces the live one.
//!
//! ## Invariants
//!
//! ```text
//! client_claimed + provider_claimed <= total_amount
//! status == CREATED  ⇒  start_time is None ∧ client_claimed == provider_claimed == 0
//! status != CREATED  ⇒  start_time is Some
//! disputed           ⇒  status == FUNDED
//! status == CLOSED   ⇒  client_claimed + provider_claimed == total_amount
//! ```

use serde::{Deserialize, Serialize};
use tranche_types::{
    Amount, DisplayStatus, DisputeResolution, EscrowStatus, EscrowTerms, PartyId, Result,
    TimeSpan, TrancheError, UnixTime,
};
use tranche_vesting::VestingSchedule;

/// State of one escrow agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowLedger {
    terms: EscrowTerms,
    start_time: Option<UnixTime>,
    dispute_extension: TimeSpan,
    status: EscrowStatus,
    disputed: bool,
    completion_approved: bool,
    client_claimed: Amount,
    provider_claimed: Amount,
    /// Time-vested amount already earned when the schedule was last
    /// extended. Extending the span never lowers what had vested.
    vested_floor: Amount,
}

impl EscrowLedger {
    /// Fresh `CREATED` ledger for validated terms.
    ///
    /// # Errors
    /// Returns [`TrancheError::InvalidConfiguration`] if the terms are
    /// invalid; no ledger exists in that case.
    pub fn new(terms: EscrowTerms) -> Result<Self> {
        terms.validate()?;
        Ok(Self {
            terms,
            start_time: None,
            dispute_extension: 0,
            status: EscrowStatus::Created,
            disputed: false,
            completion_approved: false,
            client_claimed: Amount::ZERO,
            provider_claimed: Amount::ZERO,
            vested_floor: Amount::ZERO,
        })
    }

    // -----------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------

    #[must_use]
    pub fn terms(&self) -> &EscrowTerms {
        &self.terms
    }

    #[must_use]
    pub fn client(&self) -> PartyId {
        self.terms.client
    }

    #[must_use]
    pub fn service_provider(&self) -> PartyId {
        self.terms.service_provider
    }

    #[must_use]
    pub fn total_amount(&self) -> Amount {
        self.terms.total_amount
    }

    #[must_use]
    pub fn vested_percentage(&self) -> u8 {
        self.terms.vested_percentage
    }

    #[must_use]
    pub fn total_duration(&self) -> TimeSpan {
        self.terms.total_duration
    }

    #[must_use]
    pub fn interval(&self) -> TimeSpan {
        self.terms.interval
    }

    #[must_use]
    pub fn dispute_resolution(&self) -> DisputeResolution {
        self.terms.dispute_resolution
    }

    #[must_use]
    pub fn start_time(&self) -> Option<UnixTime> {
        self.start_time
    }

    #[must_use]
    pub fn dispute_extension(&self) -> TimeSpan {
        self.dispute_extension
    }

    #[must_use]
    pub fn status(&self) -> EscrowStatus {
        self.status
    }

    #[must_use]
    pub fn is_disputed(&self) -> bool {
        self.disputed
    }

    #[must_use]
    pub fn display_status(&self) -> DisplayStatus {
        DisplayStatus::derive(self.status, self.disputed)
    }

    #[must_use]
    pub fn completion_approved(&self) -> bool {
        self.completion_approved
    }

    #[must_use]
    pub fn client_claimed(&self) -> Amount {
        self.client_claimed
    }

    #[must_use]
    pub fn provider_claimed(&self) -> Amount {
        self.provider_claimed
    }

    #[must_use]
    pub fn vested_floor(&self) -> Amount {
        self.vested_floor
    }

    /// Sum of both parties' payouts. Bounded by the total, so it cannot
    /// overflow on an audited ledger.
    #[must_use]
    pub fn total_claimed(&self) -> Amount {
        Amount::new(
            self.client_claimed
                .units()
                .saturating_add(self.provider_claimed.units()),
        )
    }

    /// Amount still held in custody for this escrow.
    #[must_use]
    pub fn outstanding(&self) -> Amount {
        if self.status == EscrowStatus::Created {
            return Amount::ZERO;
        }
        self.total_amount().saturating_sub(self.total_claimed())
    }

    /// `start + total_duration + dispute_extension`; `None` before funding.
    #[must_use]
    pub fn effective_end_time(&self) -> Option<UnixTime> {
        self.schedule().effective_end()
    }

    /// `start + total_duration`; `None` before funding.
    #[must_use]
    pub fn original_end_time(&self) -> Option<UnixTime> {
        self.schedule().original_end()
    }

    /// Calculator inputs at the current extension.
    #[must_use]
    pub fn schedule(&self) -> VestingSchedule {
        VestingSchedule {
            total_amount: self.terms.total_amount,
            vested_percentage: self.terms.vested_percentage,
            total_duration: self.terms.total_duration,
            interval: self.terms.interval,
            start_time: self.start_time,
            dispute_extension: self.dispute_extension,
        }
    }

    /// Closed with every unit paid out: logically destroyed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status == EscrowStatus::Closed && self.total_claimed() == self.total_amount()
    }

    // -----------------------------------------------------------------
    // Invariant audit
    // -----------------------------------------------------------------

    /// Check every ledger invariant.
    ///
    /// # Errors
    /// Returns [`TrancheError::ConservationViolation`] naming the first
    /// broken invariant.
    pub fn audit(&self) -> Result<()> {
        let violation = |reason: String| Err(TrancheError::ConservationViolation { reason });

        let claimed = self
            .client_claimed
            .checked_add(self.provider_claimed)
            .map_err(|_| TrancheError::ConservationViolation {
                reason: "claimed amounts overflow".into(),
            })?;
        if claimed > self.total_amount() {
            return violation(format!(
                "claimed {claimed} (client {} + provider {}) exceeds total {}",
                self.client_claimed,
                self.provider_claimed,
                self.total_amount()
            ));
        }
        match self.status {
            EscrowStatus::Created => {
                if self.start_time.is_some() || !claimed.is_zero() {
                    return violation("CREATED escrow has a start time or payouts".into());
                }
            }
            _ => {
                if self.start_time.is_none() {
                    return violation(format!("{} escrow has no start time", self.status));
                }
            }
        }
        if self.disputed && self.status != EscrowStatus::Funded {
            return violation(format!("disputed flag set while {}", self.status));
        }
        if self.status == EscrowStatus::Closed && claimed != self.total_amount() {
            return violation(format!(
                "CLOSED with {claimed} of {} paid out",
                self.total_amount()
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Mutation (controller only)
    // -----------------------------------------------------------------

    fn advance(&mut self, target: EscrowStatus, operation: &'static str) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(TrancheError::InvalidState {
                operation,
                status: self.status,
                reason: format!("cannot move from {} to {target}", self.status),
            });
        }
        self.status = target;
        Ok(())
    }

    pub(crate) fn fund(&mut self, now: UnixTime) -> Result<()> {
        self.advance(EscrowStatus::Funded, "deposit")?;
        self.start_time = Some(now);
        Ok(())
    }

    pub(crate) fn set_disputed(&mut self, disputed: bool) {
        self.disputed = disputed;
    }

    /// Lengthen the schedule, keeping at least `vested_now` vested.
    pub(crate) fn extend(&mut self, extra: TimeSpan, vested_now: Amount) -> Result<()> {
        self.dispute_extension = self
            .dispute_extension
            .checked_add(extra)
            .filter(|ext| self.terms.total_duration.checked_add(*ext).is_some())
            .ok_or_else(|| TrancheError::ArithmeticOverflow {
                context: format!("dispute extension {} + {extra}", self.dispute_extension),
            })?;
        self.vested_floor = self.vested_floor.max(vested_now);
        Ok(())
    }

    pub(crate) fn approve_completion(&mut self) -> Result<()> {
        self.advance(EscrowStatus::Completed, "approve_completion")?;
        self.completion_approved = true;
        self.disputed = false;
        Ok(())
    }

    pub(crate) fn record_provider_payout(&mut self, amount: Amount) -> Result<()> {
        self.provider_claimed = self.provider_claimed.checked_add(amount)?;
        Ok(())
    }

    pub(crate) fn record_client_refund(&mut self, amount: Amount) -> Result<()> {
        self.client_claimed = self.client_claimed.checked_add(amount)?;
        Ok(())
    }

    /// Close if every unit has been paid out. Returns whether it closed.
    pub(crate) fn close_if_settled(&mut self, operation: &'static str) -> Result<bool> {
        if self.total_claimed() != self.total_amount() {
            return Ok(false);
        }
        self.advance(EscrowStatus::Closed, operation)?;
        self.disputed = false;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded() -> EscrowLedger {
        let mut ledger = EscrowLedger::new(EscrowTerms::sample()).unwrap();
        ledger.fund(1_000).unwrap();
        ledger
    }

    #[test]
    fn new_ledger_is_created_and_clean() {
        let ledger = EscrowLedger::new(EscrowTerms::sample()).unwrap();
        assert_eq!(ledger.status(), EscrowStatus::Created);
        assert_eq!(ledger.start_time(), None);
        assert_eq!(ledger.effective_end_time(), None);
        assert_eq!(ledger.original_end_time(), None);
        assert_eq!(ledger.outstanding(), Amount::ZERO);
        assert!(!ledger.is_disputed());
        assert!(ledger.audit().is_ok());
    }

    #[test]
    fn invalid_terms_never_build_a_ledger() {
        let mut terms = EscrowTerms::sample();
        terms.interval = 7;
        let err = EscrowLedger::new(terms).unwrap_err();
        assert!(matches!(err, TrancheError::InvalidConfiguration { .. }));
    }

    #[test]
    fn funding_sets_start_and_end_times() {
        let ledger = funded();
        assert_eq!(ledger.status(), EscrowStatus::Funded);
        assert_eq!(ledger.start_time(), Some(1_000));
        assert_eq!(ledger.original_end_time(), Some(1_060));
        assert_eq!(ledger.effective_end_time(), Some(1_060));
        assert_eq!(ledger.outstanding(), Amount(1_000_000));
        assert!(ledger.audit().is_ok());
    }

    #[test]
    fn double_fund_rejected() {
        let mut ledger = funded();
        let err = ledger.fund(2_000).unwrap_err();
        assert!(matches!(err, TrancheError::InvalidState { .. }));
        assert_eq!(ledger.start_time(), Some(1_000));
    }

    #[test]
    fn extension_moves_effective_end_only() {
        let mut ledger = funded();
        ledger.extend(20, Amount(350_000)).unwrap();
        assert_eq!(ledger.effective_end_time(), Some(1_080));
        assert_eq!(ledger.original_end_time(), Some(1_060));
        assert_eq!(ledger.vested_floor(), Amount(350_000));

        ledger.extend(0, Amount(100)).unwrap();
        assert_eq!(ledger.vested_floor(), Amount(350_000));
    }

    #[test]
    fn extension_overflow_rejected() {
        let mut ledger = funded();
        let err = ledger.extend(u64::MAX, Amount::ZERO).unwrap_err();
        assert!(matches!(err, TrancheError::ArithmeticOverflow { .. }));
        assert_eq!(ledger.dispute_extension(), 0);
    }

    #[test]
    fn audit_catches_over_claim() {
        let mut ledger = funded();
        ledger.record_client_refund(Amount(600_000)).unwrap();
        ledger.record_provider_payout(Amount(500_000)).unwrap();
        let err = ledger.audit().unwrap_err();
        assert!(matches!(err, TrancheError::ConservationViolation { .. }));
    }

    #[test]
    fn audit_catches_dispute_outside_funded() {
        let mut ledger = funded();
        ledger.approve_completion().unwrap();
        ledger.set_disputed(true);
        assert!(ledger.audit().is_err());
    }

    #[test]
    fn approval_clears_dispute() {
        let mut ledger = funded();
        ledger.set_disputed(true);
        ledger.approve_completion().unwrap();
        assert!(!ledger.is_disputed());
        assert!(ledger.completion_approved());
        assert_eq!(ledger.status(), EscrowStatus::Completed);
        assert!(ledger.audit().is_ok());
    }

    #[test]
    fn closes_only_when_fully_paid() {
        let mut ledger = funded();
        ledger.record_client_refund(Amount(400_000)).unwrap();
        assert!(!ledger.close_if_settled("claim_client_refund").unwrap());
        assert_eq!(ledger.status(), EscrowStatus::Funded);

        ledger.record_provider_payout(Amount(600_000)).unwrap();
        assert!(ledger.close_if_settled("claim_provider_payout").unwrap());
        assert_eq!(ledger.status(), EscrowStatus::Closed);
        assert!(ledger.is_settled());
        assert_eq!(ledger.outstanding(), Amount::ZERO);
        assert!(ledger.audit().is_ok());
    }

    #[test]
    fn display_status_overlays_dispute() {
        let mut ledger = funded();
        ledger.set_disputed(true);
        assert_eq!(ledger.display_status(), DisplayStatus::Disputed);
    }
}

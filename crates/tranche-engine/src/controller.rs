//! Settlement controller — the only writer of an [`EscrowLedger`].
//!
//! Each mutating operation:
//! 1. Clamps `now` to the last instant this escrow committed at
//! 2. Checks the caller's role
//! 3. Checks the current state
//! 4. Applies the change to a staged copy of the ledger
//! 5. Audits the staged ledger
//! 6. Moves funds through the [`FundTransfer`] capability (if any)
//! 7. Commits the staged ledger and returns the emitted events
//!
//! A failure at any step returns before step 7, so a rejected call leaves
//! the escrow exactly as it was.

use tranche_types::{
    Amount, DisplayStatus, EngineEvent, EscrowId, EscrowStatus, EscrowTerms, EventKind, PartyId,
    Result, TimeSpan, Transition, TrancheError, UnixTime,
};
use tranche_vesting::VestingSnapshot;

use crate::accounting::{Entitlements, entitlements};
use crate::clock::clamp_to;
use crate::custody::FundTransfer;
use crate::ledger::EscrowLedger;

/// Who is calling, and when.
///
/// Identity is trusted as given; `now` is read once per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: PartyId,
    pub now: UnixTime,
}

impl CallContext {
    #[must_use]
    pub fn new(caller: PartyId, now: UnixTime) -> Self {
        Self { caller, now }
    }
}

/// One escrow instance: its id, ledger, and time high-water mark.
#[derive(Debug, Clone)]
pub struct Escrow {
    id: EscrowId,
    ledger: EscrowLedger,
    /// Latest `now` a committed operation ran at.
    last_seen: Option<UnixTime>,
}

impl Escrow {
    /// Construct an escrow in `CREATED`.
    ///
    /// # Errors
    /// Returns [`TrancheError::InvalidConfiguration`] for invalid terms.
    pub fn create(id: EscrowId, terms: EscrowTerms) -> Result<Self> {
        let ledger = EscrowLedger::new(terms)?;
        tracing::info!(
            escrow = %id,
            client = %ledger.client(),
            provider = %ledger.service_provider(),
            total = %ledger.total_amount(),
            vested_pct = ledger.vested_percentage(),
            duration = ledger.total_duration(),
            interval = ledger.interval(),
            "Escrow created"
        );
        Ok(Self {
            id,
            ledger,
            last_seen: None,
        })
    }

    /// Construct with a fresh time-ordered id.
    pub fn open(terms: EscrowTerms) -> Result<Self> {
        Self::create(EscrowId::new(), terms)
    }

    #[must_use]
    pub fn id(&self) -> EscrowId {
        self.id
    }

    #[must_use]
    pub fn ledger(&self) -> &EscrowLedger {
        &self.ledger
    }

    // =================================================================
    // Mutating operations
    // =================================================================

    /// Client deposits exactly the total amount; the vesting clock starts.
    pub fn deposit(
        &mut self,
        ctx: CallContext,
        amount: Amount,
        custody: &mut (impl FundTransfer + ?Sized),
    ) -> Result<Transition> {
        const OP: &str = "deposit";
        let now = self.effective_now(ctx.now);
        self.require_client(ctx.caller, OP)?;
        if self.ledger.status() != EscrowStatus::Created {
            return Err(self.reject_state(OP, "escrow already funded"));
        }
        if amount != self.ledger.total_amount() {
            tracing::warn!(
                escrow = %self.id,
                expected = %self.ledger.total_amount(),
                actual = %amount,
                "Deposit rejected: incorrect amount"
            );
            return Err(TrancheError::IncorrectDeposit {
                expected: self.ledger.total_amount(),
                actual: amount,
            });
        }

        let mut staged = self.ledger.clone();
        staged.fund(now)?;
        staged.audit()?;
        custody.receive(self.id, ctx.caller, amount)?;
        self.commit(staged, now);

        tracing::info!(escrow = %self.id, amount = %amount, start = now, "Escrow funded");
        Ok(Transition {
            amount,
            events: vec![self.event(now, EventKind::FundsDeposited { amount })],
        })
    }

    /// Client or provider flags the escrow as disputed.
    pub fn raise_dispute(&mut self, ctx: CallContext) -> Result<Transition> {
        const OP: &str = "raise_dispute";
        let now = self.effective_now(ctx.now);
        self.require_counterparty(ctx.caller, OP)?;
        if self.ledger.status() != EscrowStatus::Funded {
            return Err(self.reject_state(OP, "only a funded escrow can be disputed"));
        }
        if self.ledger.is_disputed() {
            return Err(self.reject_state(OP, "escrow is already disputed"));
        }

        let mut staged = self.ledger.clone();
        staged.set_disputed(true);
        staged.audit()?;
        self.commit(staged, now);

        tracing::info!(escrow = %self.id, by = %ctx.caller, "Dispute raised");
        Ok(Transition {
            amount: Amount::ZERO,
            events: vec![self.event(now, EventKind::DisputeRaised { by: ctx.caller })],
        })
    }

    /// Clear a dispute, extending the schedule by `extra` (may be zero).
    ///
    /// Who may call this is set by the escrow's dispute resolution policy.
    /// Amounts already vested at `now` stay vested after the extension.
    pub fn resolve_dispute(&mut self, ctx: CallContext, extra: TimeSpan) -> Result<Transition> {
        const OP: &str = "resolve_dispute";
        let now = self.effective_now(ctx.now);
        if !self
            .ledger
            .dispute_resolution()
            .permits(ctx.caller, self.ledger.client())
        {
            return Err(self.reject_caller(ctx.caller, OP));
        }
        if !self.ledger.is_disputed() {
            return Err(self.reject_state(OP, "escrow is not disputed"));
        }

        let vested_now = entitlements(&self.ledger, now).provider_vested;
        let mut staged = self.ledger.clone();
        staged.set_disputed(false);
        staged.extend(extra, vested_now)?;
        staged.audit()?;
        self.commit(staged, now);

        let effective_end = self.ledger.effective_end_time().unwrap_or(now);
        tracing::info!(
            escrow = %self.id,
            by = %ctx.caller,
            extension = extra,
            effective_end,
            "Dispute resolved"
        );
        Ok(Transition {
            amount: Amount::ZERO,
            events: vec![self.event(
                now,
                EventKind::DisputeResolved {
                    by: ctx.caller,
                    extension: extra,
                    effective_end,
                },
            )],
        })
    }

    /// Client approves completion; the settlement share becomes the
    /// provider's. Clears any open dispute.
    pub fn approve_completion(&mut self, ctx: CallContext) -> Result<Transition> {
        const OP: &str = "approve_completion";
        let now = self.effective_now(ctx.now);
        self.require_client(ctx.caller, OP)?;
        if self.ledger.status() != EscrowStatus::Funded {
            return Err(self.reject_state(OP, "only a funded escrow can be approved"));
        }

        let mut staged = self.ledger.clone();
        staged.approve_completion()?;
        staged.audit()?;
        self.commit(staged, now);

        tracing::info!(escrow = %self.id, "Completion approved");
        Ok(Transition {
            amount: Amount::ZERO,
            events: vec![self.event(now, EventKind::CompletionApproved { by: ctx.caller })],
        })
    }

    /// Provider claims everything owed at `now`.
    ///
    /// Owing nothing is a zero-amount success with no events.
    pub fn claim_provider_payout(
        &mut self,
        ctx: CallContext,
        custody: &mut (impl FundTransfer + ?Sized),
    ) -> Result<Transition> {
        const OP: &str = "claim_provider_payout";
        let now = self.effective_now(ctx.now);
        if ctx.caller != self.ledger.service_provider() {
            return Err(self.reject_caller(ctx.caller, OP));
        }
        self.require_claimable(OP)?;

        let owed = entitlements(&self.ledger, now).provider_owed;
        if owed.is_zero() {
            tracing::debug!(escrow = %self.id, now, "Provider claim: nothing owed");
            return Ok(Transition::noop());
        }

        let mut staged = self.ledger.clone();
        staged.record_provider_payout(owed)?;
        let closed = staged.close_if_settled(OP)?;
        staged.audit()?;
        custody.pay_out(self.id, ctx.caller, owed)?;
        self.commit(staged, now);

        tracing::info!(escrow = %self.id, amount = %owed, closed, "Provider paid");
        let mut events = vec![self.event(now, EventKind::ProviderPaid { amount: owed })];
        if closed {
            events.push(self.closed_event(now));
        }
        Ok(Transition {
            amount: owed,
            events,
        })
    }

    /// Client reclaims up to the current unvested remainder.
    ///
    /// Usable at any time while funded or completed, including while
    /// disputed. A refund that pays out the last held unit closes the
    /// escrow. A zero amount is a no-op.
    pub fn claim_client_refund(
        &mut self,
        ctx: CallContext,
        amount: Amount,
        custody: &mut (impl FundTransfer + ?Sized),
    ) -> Result<Transition> {
        const OP: &str = "claim_client_refund";
        let now = self.effective_now(ctx.now);
        self.require_client(ctx.caller, OP)?;
        self.require_claimable(OP)?;

        let max = entitlements(&self.ledger, now).max_client_refund;
        if amount > max {
            tracing::warn!(
                escrow = %self.id,
                requested = %amount,
                max = %max,
                "Refund rejected: exceeds max"
            );
            return Err(TrancheError::InsufficientClaim {
                requested: amount,
                available: max,
            });
        }
        if amount.is_zero() {
            return Ok(Transition::noop());
        }

        let mut staged = self.ledger.clone();
        staged.record_client_refund(amount)?;
        let closed = staged.close_if_settled(OP)?;
        staged.audit()?;
        custody.pay_out(self.id, ctx.caller, amount)?;
        self.commit(staged, now);

        tracing::info!(escrow = %self.id, amount = %amount, closed, "Client refunded");
        let mut events = vec![self.event(now, EventKind::ClientRefunded { amount })];
        if closed {
            events.push(self.closed_event(now));
        }
        Ok(Transition { amount, events })
    }

    // =================================================================
    // Read-only queries
    // =================================================================

    #[must_use]
    pub fn status(&self) -> EscrowStatus {
        self.ledger.status()
    }

    #[must_use]
    pub fn is_disputed(&self) -> bool {
        self.ledger.is_disputed()
    }

    #[must_use]
    pub fn display_status(&self) -> DisplayStatus {
        self.ledger.display_status()
    }

    #[must_use]
    pub fn effective_end_time(&self) -> Option<UnixTime> {
        self.ledger.effective_end_time()
    }

    #[must_use]
    pub fn original_end_time(&self) -> Option<UnixTime> {
        self.ledger.original_end_time()
    }

    /// Full accounting at `now`.
    #[must_use]
    pub fn entitlements(&self, now: UnixTime) -> Entitlements {
        entitlements(&self.ledger, self.effective_now(now))
    }

    /// Vesting breakdown at `now`.
    #[must_use]
    pub fn vesting(&self, now: UnixTime) -> VestingSnapshot {
        self.entitlements(now).vesting
    }

    /// Time-vested amount credited to the provider at `now`.
    #[must_use]
    pub fn provider_vested_to_date(&self, now: UnixTime) -> Amount {
        self.entitlements(now).provider_vested
    }

    /// Hard ceiling for [`Escrow::claim_client_refund`] at `now`.
    #[must_use]
    pub fn max_client_refund(&self, now: UnixTime) -> Amount {
        self.entitlements(now).max_client_refund
    }

    /// Display value of the client refund at `now`; a later claim may see
    /// a smaller maximum if intervals have vested in between.
    #[must_use]
    pub fn estimated_client_refund(&self, now: UnixTime) -> Amount {
        self.max_client_refund(now)
    }

    /// What [`Escrow::claim_provider_payout`] would pay at `now`.
    #[must_use]
    pub fn estimated_provider_payout(&self, now: UnixTime) -> Amount {
        self.entitlements(now).provider_owed
    }

    // =================================================================
    // Internals
    // =================================================================

    fn effective_now(&self, now: UnixTime) -> UnixTime {
        let (effective, clamped) = clamp_to(self.last_seen, now);
        if clamped {
            tracing::warn!(
                escrow = %self.id,
                requested = now,
                clamped_to = effective,
                "Time went backwards for escrow; clamping"
            );
        }
        effective
    }

    fn commit(&mut self, staged: EscrowLedger, now: UnixTime) {
        self.ledger = staged;
        self.last_seen = Some(now);
    }

    fn event(&self, at: UnixTime, kind: EventKind) -> EngineEvent {
        EngineEvent::new(self.id, at, kind)
    }

    fn closed_event(&self, at: UnixTime) -> EngineEvent {
        tracing::info!(escrow = %self.id, "Escrow closed");
        self.event(
            at,
            EventKind::EscrowClosed {
                client_total: self.ledger.client_claimed(),
                provider_total: self.ledger.provider_claimed(),
            },
        )
    }

    fn reject_caller(&self, caller: PartyId, operation: &'static str) -> TrancheError {
        tracing::warn!(escrow = %self.id, caller = %caller, operation, "Unauthorized call");
        TrancheError::Unauthorized { caller, operation }
    }

    fn reject_state(&self, operation: &'static str, reason: &str) -> TrancheError {
        tracing::warn!(
            escrow = %self.id,
            status = %self.ledger.status(),
            operation,
            reason,
            "Operation rejected in current state"
        );
        TrancheError::InvalidState {
            operation,
            status: self.ledger.status(),
            reason: reason.to_string(),
        }
    }

    fn require_client(&self, caller: PartyId, operation: &'static str) -> Result<()> {
        if caller == self.ledger.client() {
            Ok(())
        } else {
            Err(self.reject_caller(caller, operation))
        }
    }

    fn require_counterparty(&self, caller: PartyId, operation: &'static str) -> Result<()> {
        if caller == self.ledger.client() || caller == self.ledger.service_provider() {
            Ok(())
        } else {
            Err(self.reject_caller(caller, operation))
        }
    }

    fn require_claimable(&self, operation: &'static str) -> Result<()> {
        if self.ledger.status().is_claimable() {
            Ok(())
        } else {
            Err(self.reject_state(operation, "escrow is not funded or is closed"))
        }
    }
}

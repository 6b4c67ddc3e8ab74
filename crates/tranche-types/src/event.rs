//! Engine events — the explicit record of what each mutating operation
//! changed.
//!
//! Off-chain mirrors (metadata stores, dashboards) consume these instead of
//! polling. The engine emits them but keeps no history of its own.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, EscrowId, PartyId, TimeSpan, UnixTime};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The client deposited the full escrow amount; vesting started.
    FundsDeposited { amount: Amount },
    /// A counterparty flagged the escrow as disputed.
    DisputeRaised { by: PartyId },
    /// The dispute was cleared, optionally extending the schedule.
    DisputeResolved {
        by: PartyId,
        extension: TimeSpan,
        effective_end: UnixTime,
    },
    /// The client approved completion; the settlement share is the
    /// provider's.
    CompletionApproved { by: PartyId },
    /// Funds paid out to the service provider.
    ProviderPaid { amount: Amount },
    /// Funds refunded to the client.
    ClientRefunded { amount: Amount },
    /// Every unit has been paid out.
    EscrowClosed {
        client_total: Amount,
        provider_total: Amount,
    },
}

impl EventKind {
    /// Stable snake_case name, matching the serialized `type` tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::FundsDeposited { .. } => "funds_deposited",
            Self::DisputeRaised { .. } => "dispute_raised",
            Self::DisputeResolved { .. } => "dispute_resolved",
            Self::CompletionApproved { .. } => "completion_approved",
            Self::ProviderPaid { .. } => "provider_paid",
            Self::ClientRefunded { .. } => "client_refunded",
            Self::EscrowClosed { .. } => "escrow_closed",
        }
    }
}

/// One event, stamped with the escrow and the schedule time it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub escrow_id: EscrowId,
    pub at: UnixTime,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl EngineEvent {
    #[must_use]
    pub fn new(escrow_id: EscrowId, at: UnixTime, kind: EventKind) -> Self {
        Self {
            escrow_id,
            at,
            kind,
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{} {}", self.escrow_id, self.at, self.kind.name())
    }
}

/// Result of a committed mutating operation.
///
/// `amount` is the value moved by the operation (the deposit, the payout or
/// the refund); zero for pure state changes and for claims with nothing
/// owed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub amount: Amount,
    pub events: Vec<EngineEvent>,
}

impl Transition {
    /// A successful call that changed nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.amount.is_zero() && self.events.is_empty()
    }

    /// Whether an [`EventKind::EscrowClosed`] was emitted.
    #[must_use]
    pub fn closed(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e.kind, EventKind::EscrowClosed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_serde_tags() {
        let kinds = vec![
            EventKind::FundsDeposited { amount: Amount(1) },
            EventKind::DisputeRaised {
                by: PartyId([1u8; 20]),
            },
            EventKind::DisputeResolved {
                by: PartyId([1u8; 20]),
                extension: 20,
                effective_end: 80,
            },
            EventKind::CompletionApproved {
                by: PartyId([1u8; 20]),
            },
            EventKind::ProviderPaid { amount: Amount(2) },
            EventKind::ClientRefunded { amount: Amount(3) },
            EventKind::EscrowClosed {
                client_total: Amount(3),
                provider_total: Amount(2),
            },
        ];
        for kind in kinds {
            let value = serde_json::to_value(&kind).unwrap();
            assert_eq!(value["type"], kind.name());
        }
    }

    #[test]
    fn engine_event_flattens_kind() {
        let event = EngineEvent::new(
            EscrowId::new(),
            42,
            EventKind::ProviderPaid {
                amount: Amount(350_000),
            },
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "provider_paid");
        assert_eq!(value["amount"], 350_000);
        assert_eq!(value["at"], 42);
    }

    #[test]
    fn noop_transition() {
        let t = Transition::noop();
        assert!(t.is_noop());
        assert!(!t.closed());
    }
}

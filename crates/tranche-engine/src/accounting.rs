//! Entitlement accounting — who may claim what at `now`.
//!
//! Both claim operations and all three estimate queries read from
//! [`entitlements`], so a quoted amount and the amount a claim pays at the
//! same instant are always identical.
//!
//! ```text
//! provider_vested      = max(vested_to_date(now), vested_floor)
//! provider_gross       = provider_vested + (approved ? settlement_share : 0)
//! provider_entitlement = max(min(provider_gross, total - client_claimed), provider_claimed)
//! provider_owed        = provider_entitlement - provider_claimed
//! max_client_refund    = total - provider_entitlement - client_claimed
//! ```
//!
//! The `total - client_claimed` cap is what keeps an early client refund
//! from being paid a second time to the provider as later intervals vest.
//! With no payouts yet, `max_client_refund` reduces to
//! `total - vested_to_date - (approved ? settlement_share : 0)`.

use serde::{Deserialize, Serialize};
use tranche_types::{Amount, UnixTime};
use tranche_vesting::{VestingSnapshot, snapshot};

use crate::ledger::EscrowLedger;

/// Claimable amounts for both parties at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlements {
    pub vesting: VestingSnapshot,
    /// Time-vested amount credited to the provider (never below the floor
    /// recorded at the last schedule extension).
    pub provider_vested: Amount,
    /// Everything the provider has earned so far, claimed or not.
    pub provider_entitlement: Amount,
    /// What a provider claim would pay right now.
    pub provider_owed: Amount,
    /// The most a client refund may take right now.
    pub max_client_refund: Amount,
}

/// Compute entitlements for `ledger` at `now`.
///
/// Outside `FUNDED`/`COMPLETED` nothing is claimable by either party.
#[must_use]
pub fn entitlements(ledger: &EscrowLedger, now: UnixTime) -> Entitlements {
    let vesting = snapshot(&ledger.schedule(), now);
    let total = ledger.total_amount();

    if !ledger.status().is_claimable() {
        return Entitlements {
            vesting,
            provider_vested: vesting.provider_vested_to_date,
            provider_entitlement: ledger.provider_claimed(),
            provider_owed: Amount::ZERO,
            max_client_refund: Amount::ZERO,
        };
    }

    let provider_vested = vesting
        .provider_vested_to_date
        .max(ledger.vested_floor());
    let settlement = if ledger.completion_approved() {
        vesting.settlement_share
    } else {
        Amount::ZERO
    };
    let gross = Amount::new(
        provider_vested
            .units()
            .saturating_add(settlement.units()),
    );
    let cap = total.saturating_sub(ledger.client_claimed());
    let provider_entitlement = gross.min(cap).max(ledger.provider_claimed());

    Entitlements {
        vesting,
        provider_vested,
        provider_entitlement,
        provider_owed: provider_entitlement.saturating_sub(ledger.provider_claimed()),
        max_client_refund: total
            .saturating_sub(provider_entitlement)
            .saturating_sub(ledger.client_claimed()),
    }
}

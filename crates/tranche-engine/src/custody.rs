//! Fund custody.
//!
//! The controller never touches balances directly; it moves funds through a
//! [`FundTransfer`] capability passed into each operation. A transfer is the
//! last step before an operation commits, so a refused transfer leaves the
//! ledger untouched.
//!
//! [`InMemoryCustody`] is the reference implementation: per-party wallets,
//! per-escrow held balances, and a supply conservation check:
//!
//! ```text
//! Σ wallets + Σ held == Σ minted - Σ withdrawn
//! ```

use std::collections::HashMap;

use tranche_types::{Amount, EscrowId, PartyId, Result, TrancheError};

/// Capability to move funds between a party and an escrow's custody.
pub trait FundTransfer {
    /// Move `amount` from `from`'s funds into custody for `escrow`.
    fn receive(&mut self, escrow: EscrowId, from: PartyId, amount: Amount) -> Result<()>;

    /// Move `amount` out of `escrow`'s custody to `to`.
    fn pay_out(&mut self, escrow: EscrowId, to: PartyId, amount: Amount) -> Result<()>;
}

/// In-process custody with conservation tracking.
#[derive(Debug, Default)]
pub struct InMemoryCustody {
    /// Spendable balance per party.
    wallets: HashMap<PartyId, Amount>,
    /// Funds locked per escrow.
    held: HashMap<EscrowId, Amount>,
    /// Total ever credited from outside the system.
    minted: Amount,
    /// Total ever withdrawn to outside the system.
    withdrawn: Amount,
}

impl InMemoryCustody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a party's wallet from outside the system.
    pub fn fund_wallet(&mut self, party: PartyId, amount: Amount) -> Result<()> {
        let minted = self.minted.checked_add(amount)?;
        let wallet = self.balance(party).checked_add(amount)?;
        self.wallets.insert(party, wallet);
        self.minted = minted;
        Ok(())
    }

    /// Remove funds from a party's wallet to outside the system.
    pub fn withdraw(&mut self, party: PartyId, amount: Amount) -> Result<()> {
        let available = self.balance(party);
        if available < amount {
            return Err(TrancheError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        let withdrawn = self.withdrawn.checked_add(amount)?;
        self.wallets.insert(party, available.checked_sub(amount)?);
        self.withdrawn = withdrawn;
        Ok(())
    }

    /// Spendable balance of a party.
    #[must_use]
    pub fn balance(&self, party: PartyId) -> Amount {
        self.wallets.get(&party).copied().unwrap_or_default()
    }

    /// Funds currently locked for an escrow.
    #[must_use]
    pub fn held(&self, escrow: EscrowId) -> Amount {
        self.held.get(&escrow).copied().unwrap_or_default()
    }

    /// Expected supply: minted minus withdrawn.
    #[must_use]
    pub fn expected_supply(&self) -> Amount {
        self.minted.saturating_sub(self.withdrawn)
    }

    /// Verify that wallets plus held funds equal the expected supply.
    ///
    /// # Errors
    /// Returns [`TrancheError::ConservationViolation`] if actual ≠ expected.
    pub fn verify_supply(&self) -> Result<()> {
        let wallets: u128 = self.wallets.values().map(|a| a.units()).sum();
        let held: u128 = self.held.values().map(|a| a.units()).sum();
        let actual = Amount::new(wallets).checked_add(Amount::new(held))?;
        let expected = self.expected_supply();
        if actual != expected {
            return Err(TrancheError::ConservationViolation {
                reason: format!(
                    "custody supply {actual} != expected {expected} \
                     (wallets={wallets}, held={held}, minted={}, withdrawn={})",
                    self.minted, self.withdrawn
                ),
            });
        }
        Ok(())
    }
}

impl FundTransfer for InMemoryCustody {
    fn receive(&mut self, escrow: EscrowId, from: PartyId, amount: Amount) -> Result<()> {
        let available = self.balance(from);
        if available < amount {
            return Err(TrancheError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        let held = self.held(escrow).checked_add(amount)?;
        self.wallets.insert(from, available.checked_sub(amount)?);
        self.held.insert(escrow, held);
        Ok(())
    }

    fn pay_out(&mut self, escrow: EscrowId, to: PartyId, amount: Amount) -> Result<()> {
        let held = self.held(escrow);
        if held < amount {
            return Err(TrancheError::InsufficientFunds {
                needed: amount,
                available: held,
            });
        }
        let wallet = self.balance(to).checked_add(amount)?;
        self.held.insert(escrow, held.checked_sub(amount)?);
        self.wallets.insert(to, wallet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fund_and_withdraw() {
        let mut custody = InMemoryCustody::new();
        let alice = PartyId::random();
        custody.fund_wallet(alice, Amount(1_000)).unwrap();
        assert_eq!(custody.balance(alice), Amount(1_000));

        custody.withdraw(alice, Amount(300)).unwrap();
        assert_eq!(custody.balance(alice), Amount(700));
        assert_eq!(custody.expected_supply(), Amount(700));
        custody.verify_supply().unwrap();
    }

    #[test]
    fn withdraw_more_than_balance_fails() {
        let mut custody = InMemoryCustody::new();
        let alice = PartyId::random();
        custody.fund_wallet(alice, Amount(100)).unwrap();
        let err = custody.withdraw(alice, Amount(200)).unwrap_err();
        assert!(matches!(err, TrancheError::InsufficientFunds { .. }));
        assert_eq!(custody.balance(alice), Amount(100));
    }

    #[test]
    fn receive_locks_funds() {
        let mut custody = InMemoryCustody::new();
        let client = PartyId::random();
        let escrow = EscrowId::new();
        custody.fund_wallet(client, Amount(1_000)).unwrap();

        custody.receive(escrow, client, Amount(1_000)).unwrap();
        assert_eq!(custody.balance(client), Amount::ZERO);
        assert_eq!(custody.held(escrow), Amount(1_000));
        custody.verify_supply().unwrap();
    }

    #[test]
    fn receive_insufficient_wallet() {
        let mut custody = InMemoryCustody::new();
        let client = PartyId::random();
        let escrow = EscrowId::new();
        custody.fund_wallet(client, Amount(10)).unwrap();
        let err = custody.receive(escrow, client, Amount(11)).unwrap_err();
        assert!(matches!(err, TrancheError::InsufficientFunds { .. }));
        assert_eq!(custody.held(escrow), Amount::ZERO);
        assert_eq!(custody.balance(client), Amount(10));
    }

    #[test]
    fn pay_out_releases_funds() {
        let mut custody = InMemoryCustody::new();
        let client = PartyId::random();
        let provider = PartyId::random();
        let escrow = EscrowId::new();
        custody.fund_wallet(client, Amount(1_000)).unwrap();
        custody.receive(escrow, client, Amount(1_000)).unwrap();

        custody.pay_out(escrow, provider, Amount(700)).unwrap();
        custody.pay_out(escrow, client, Amount(300)).unwrap();
        assert_eq!(custody.balance(provider), Amount(700));
        assert_eq!(custody.balance(client), Amount(300));
        assert_eq!(custody.held(escrow), Amount::ZERO);
        custody.verify_supply().unwrap();
    }

    #[test]
    fn pay_out_beyond_held_fails() {
        let mut custody = InMemoryCustody::new();
        let client = PartyId::random();
        let escrow = EscrowId::new();
        custody.fund_wallet(client, Amount(100)).unwrap();
        custody.receive(escrow, client, Amount(100)).unwrap();
        let err = custody.pay_out(escrow, client, Amount(101)).unwrap_err();
        assert!(matches!(err, TrancheError::InsufficientFunds { .. }));
        assert_eq!(custody.held(escrow), Amount(100));
    }

    #[test]
    fn escrows_are_isolated() {
        let mut custody = InMemoryCustody::new();
        let client = PartyId::random();
        let (a, b) = (EscrowId::new(), EscrowId::new());
        custody.fund_wallet(client, Amount(300)).unwrap();
        custody.receive(a, client, Amount(100)).unwrap();
        custody.receive(b, client, Amount(200)).unwrap();
        assert!(custody.pay_out(a, client, Amount(150)).is_err());
        custody.pay_out(b, client, Amount(150)).unwrap();
        custody.verify_supply().unwrap();
    }
}

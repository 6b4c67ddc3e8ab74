//! # tranche-engine
//!
//! **Settlement plane**: the escrow ledger, the controller that is its only
//! writer, fund custody, and a registry of independent escrows.
//!
//! ## Architecture
//!
//! Every mutating call on an [`Escrow`]:
//! 1. Clamps `now` so time never runs backwards for that escrow
//! 2. Authorizes the caller against the escrow's parties
//! 3. Checks the lifecycle state
//! 4. Stages the ledger change and audits it
//! 5. Moves funds through [`FundTransfer`]
//! 6. Commits and returns a [`Transition`](tranche_types::Transition)
//!
//! ## Lifecycle
//!
//! ```text
//! CREATED ──deposit──▶ FUNDED ──approve──▶ COMPLETED
//!                        │  ▲                  │
//!          raise_dispute │  │ resolve_dispute  │
//!                        ▼  │                  │
//!                     (disputed)               │
//!                                              ▼
//!          FUNDED / COMPLETED ──all units paid──▶ CLOSED
//! ```

pub mod accounting;
pub mod book;
pub mod clock;
pub mod controller;
pub mod custody;
pub mod ledger;

pub use accounting::{Entitlements, entitlements};
pub use book::{EscrowBook, EscrowHandle, PartyRole};
pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use controller::{CallContext, Escrow};
pub use custody::{FundTransfer, InMemoryCustody};
pub use ledger::EscrowLedger;

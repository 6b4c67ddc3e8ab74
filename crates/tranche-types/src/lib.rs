//! # tranche-types
//!
//! Shared types, errors, and configuration for the **Tranche** vesting
//! escrow engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`PartyId`], [`EscrowId`]
//! - **Amounts and time**: [`Amount`], [`UnixTime`], [`TimeSpan`]
//! - **Terms**: [`EscrowTerms`], [`DisputeResolution`]
//! - **Lifecycle**: [`EscrowStatus`], [`DisplayStatus`]
//! - **Events**: [`EngineEvent`], [`EventKind`], [`Transition`]
//! - **Errors**: [`TrancheError`] with `TR_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod status;

// Re-export all primary types at crate root for ergonomic imports:
//   use tranche_types::{Amount, EscrowTerms, EscrowStatus, ...};

pub use amount::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use status::*;

// Constants are accessed via `tranche_types::constants::FOO`
// (not re-exported to avoid name collisions).

//! # tranche-cli — operator command-line interface
//!
//! ## Subcommands
//!
//! - `schedule` — vesting table for a set of escrow terms
//! - `replay` — run a scripted escrow session and print its events
//!
//! Argument parsing lives here; every computation is delegated to
//! `tranche-vesting` and `tranche-engine`.

pub mod replay;
pub mod schedule;

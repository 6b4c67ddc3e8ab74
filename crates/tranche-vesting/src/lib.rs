//! # tranche-vesting
//!
//! **Pure vesting calculator** — zero side effects, fully deterministic.
//!
//! Given an escrow's schedule inputs and a point in time, computes how much
//! of the locked amount has vested to the service provider. The settlement
//! controller calls into this crate on every query and every claim; nothing
//! is cached between calls.
//!
//! ## Modules
//!
//! - [`rounding`]: the single round-down policy shared by every formula
//! - [`calculator`]: [`VestingSchedule`] → [`VestingSnapshot`]
//! - [`timeline`]: per-interval schedule tables built from the calculator

pub mod calculator;
pub mod rounding;
pub mod timeline;

pub use calculator::{
    VestingSchedule, VestingSnapshot, provider_vested_to_date, settlement_share, snapshot,
    vested_share,
};
pub use rounding::{fraction_of, percent_of};
pub use timeline::{ScheduleRow, schedule_table, step_count};

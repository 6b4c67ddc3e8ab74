//! System-wide constants for the Tranche escrow engine.

/// Upper bound on the time-vested percentage. The remaining share (at least
/// 10%) is always gated on completion approval.
pub const MAX_VESTED_PERCENTAGE: u8 = 90;

/// Denominator of every percentage computation.
pub const PERCENT_DENOMINATOR: u128 = 100;

/// Seconds in one schedule minute (terms entered in minutes are stored in
/// seconds).
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Decimal places of the reference currency (wei → ETH) used for display.
pub const DEFAULT_DISPLAY_DECIMALS: u32 = 18;

/// Most rows a schedule table will hold. Terms with more intervals than
/// this are tabulated only up to this step.
pub const MAX_SCHEDULE_ROWS: u64 = 100_000;

/// Initial capacity of an escrow book.
pub const DEFAULT_BOOK_CAPACITY: usize = 64;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Tranche";

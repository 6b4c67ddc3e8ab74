//! Escrow lifecycle status.
//!
//! ```text
//!   ┌─────────┐ deposit ┌────────┐ approve ┌───────────┐
//!   │ CREATED ├────────▶│ FUNDED ├────────▶│ COMPLETED │
//!   └─────────┘         └───┬────┘         └─────┬─────┘
//!                           │ all funds claimed  │ all funds claimed
//!                           ▼                    ▼
//!                       ┌────────────────────────────┐
//!                       │           CLOSED           │
//!                       └────────────────────────────┘
//! ```
//!
//! `disputed` is an orthogonal flag, meaningful only while `FUNDED`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of one escrow. Transitions are **monotonic**.
///
/// Discriminants match the numbering the dashboards read from the
/// original contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EscrowStatus {
    /// Constructed; awaiting the client's deposit.
    Created = 0,
    /// Funds in custody; vesting clock running.
    Funded = 1,
    /// Client approved completion; settlement share released to provider.
    Completed = 2,
    /// Every unit paid out. **Terminal.**
    Closed = 3,
}

impl EscrowStatus {
    /// Can this status advance to `target`?
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Funded)
                | (Self::Funded, Self::Completed | Self::Closed)
                | (Self::Completed, Self::Closed)
        )
    }

    /// Whether payouts may be claimed in this status.
    #[must_use]
    pub fn is_claimable(self) -> bool {
        matches!(self, Self::Funded | Self::Completed)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Funded => write!(f, "FUNDED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Status as presented to people: `Disputed` overrides any non-closed
/// status while the dispute flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Created,
    Funded,
    Disputed,
    Completed,
    Closed,
}

impl DisplayStatus {
    #[must_use]
    pub fn derive(status: EscrowStatus, disputed: bool) -> Self {
        match status {
            EscrowStatus::Closed => Self::Closed,
            _ if disputed => Self::Disputed,
            EscrowStatus::Created => Self::Created,
            EscrowStatus::Funded => Self::Funded,
            EscrowStatus::Completed => Self::Completed,
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Funded => "funded",
            Self::Disputed => "disputed",
            Self::Completed => "completed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

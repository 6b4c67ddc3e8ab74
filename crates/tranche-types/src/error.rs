//! Error types for the Tranche escrow engine.
//!
//! All errors use the `TR_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Configuration errors (fatal at construction)
//! - 2xx: Authorization errors
//! - 3xx: State machine errors
//! - 4xx: Claim / amount errors
//! - 5xx: Custody / transfer errors
//! - 6xx: Invariant violations
//! - 7xx: Escrow book errors
//! - 9xx: General / internal errors
//!
//! Every rejected operation leaves the ledger exactly as it was before the
//! call. "Nothing to claim" is not an error: it is a zero-amount success.

use thiserror::Error;

use crate::{Amount, EscrowId, EscrowStatus, PartyId};

/// Central error enum for all Tranche operations.
#[derive(Debug, Error)]
pub enum TrancheError {
    // =================================================================
    // Configuration Errors (1xx)
    // =================================================================
    /// Escrow terms are invalid; the instance is never created.
    #[error("TR_ERR_100: Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// The caller does not hold the role this operation requires.
    #[error("TR_ERR_200: Unauthorized: {caller} may not {operation}")]
    Unauthorized {
        caller: PartyId,
        operation: &'static str,
    },

    // =================================================================
    // State Machine Errors (3xx)
    // =================================================================
    /// The operation is not valid from the escrow's current state.
    #[error("TR_ERR_300: Invalid state for {operation} (status {status}): {reason}")]
    InvalidState {
        operation: &'static str,
        status: EscrowStatus,
        reason: String,
    },

    // =================================================================
    // Claim / Amount Errors (4xx)
    // =================================================================
    /// A refund request exceeds what the client may currently claim.
    #[error("TR_ERR_400: Insufficient claim: requested {requested}, max {available}")]
    InsufficientClaim { requested: Amount, available: Amount },

    /// The deposit did not match the escrow's total amount exactly.
    #[error("TR_ERR_401: Incorrect deposit: expected {expected}, got {actual}")]
    IncorrectDeposit { expected: Amount, actual: Amount },

    // =================================================================
    // Custody Errors (5xx)
    // =================================================================
    /// The fund-transfer capability refused the movement.
    #[error("TR_ERR_500: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// A wallet or escrow holding cannot cover the requested movement.
    #[error("TR_ERR_501: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    // =================================================================
    // Invariant Violations (6xx)
    // =================================================================
    /// Conservation or ledger invariant violated — critical safety alert.
    #[error("TR_ERR_600: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    // =================================================================
    // Escrow Book Errors (7xx)
    // =================================================================
    /// No escrow with this id is registered.
    #[error("TR_ERR_700: Escrow not found: {0}")]
    EscrowNotFound(EscrowId),

    /// An escrow with this id is already registered.
    #[error("TR_ERR_701: Escrow already exists: {0}")]
    DuplicateEscrow(EscrowId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Checked arithmetic overflowed or underflowed.
    #[error("TR_ERR_900: Arithmetic overflow: {context}")]
    ArithmeticOverflow { context: String },

    /// Serialization / deserialization error.
    #[error("TR_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// I/O error (reading terms or scripts from disk).
    #[error("TR_ERR_902: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, TrancheError>;

impl From<std::io::Error> for TrancheError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrancheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

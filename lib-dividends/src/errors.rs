//! Dividend Ledger Errors

use lib_types::Amount;
use thiserror::Error;

/// Error during ledger operations
///
/// Every variant aborts the requested operation; the ledger is left exactly
/// as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DividendError {
    #[error("Recipient is the null identity")]
    InvalidRecipient,

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("Deposit amount must be greater than zero")]
    InvalidDeposit,

    #[error("Cannot distribute a deposit with no outstanding supply")]
    NoSupply,

    #[error("Nothing to claim")]
    NothingToClaim,

    #[error("Payout failed: {0}")]
    PayoutFailed(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Conservation invariant violated: {0}")]
    ConservationViolated(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Result type for ledger operations
pub type DividendResult<T> = Result<T, DividendError>;

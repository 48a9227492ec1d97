//! Error types for the ledger core.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors returned by the ledger core.
///
/// Validation errors are detected before any write begins; everything else
/// rolls back the enclosing unit of work before surfacing.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Transaction and plan amounts must be strictly positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Malformed or out-of-range input (month count, dates, description).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The entity exists but belongs to a different user.
    #[error("{0} does not belong to the requesting user")]
    Unauthorized(&'static str),

    /// The installment has already been marked paid.
    #[error("installment already paid")]
    AlreadyPaid,

    /// The underlying store failed or a unit of work could not commit.
    /// Transient; the caller may retry the whole operation.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

//! SQLite implementation of the ledger store.

pub mod client_repository;
pub mod connection;
pub mod installment_repository;
pub mod transaction_repository;
pub mod unit_of_work;
pub mod user_repository;

pub use client_repository::ClientRepository;
pub use connection::LedgerDb;
pub use installment_repository::InstallmentRepository;
pub use transaction_repository::TransactionRepository;
pub use unit_of_work::UnitOfWork;
pub use user_repository::UserRepository;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{LedgerError, Result};

/// Parse an RFC 3339 timestamp column back into a `DateTime<Utc>`.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LedgerError::Storage(sqlx::Error::Decode(Box::new(e))))
}

/// Parse a `YYYY-MM-DD` date column.
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| LedgerError::Storage(sqlx::Error::Decode(Box::new(e))))
}

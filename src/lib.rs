//! Consistency core for a client money ledger.
//!
//! Per-client balances derive from an append-only stream of signed
//! transactions ("received" / "given"); user aggregates derive from client
//! balances; installment plans decompose a receivable into monthly dues.
//! Every mutation that moves money runs as one atomic unit of work against
//! the SQLite store, so the denormalized balances never drift from the
//! transactions that define them.
//!
//! HTTP routing, authentication and rendering are external collaborators:
//! they hand this crate validated, typed arguments and receive success
//! values or structured [`LedgerError`]s back.

pub mod domain;
pub mod error;
pub mod storage;

pub use error::{LedgerError, Result};

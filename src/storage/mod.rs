//! Storage layer for the ledger core.

pub mod sqlite;

pub use sqlite::{
    ClientRepository, InstallmentRepository, LedgerDb, TransactionRepository, UnitOfWork,
    UserRepository,
};

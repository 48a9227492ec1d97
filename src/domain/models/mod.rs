//! Domain models for the ledger core.

pub mod client;
pub mod installment;
pub mod money;
pub mod transaction;
pub mod user;

pub use client::Client;
pub use installment::{Installment, InstallmentPlan, InstallmentStatus};
pub use transaction::{Transaction, TransactionKind};
pub use user::User;

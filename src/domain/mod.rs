//! Domain layer: services and models for the ledger core.

pub mod balance_service;
pub mod calendar;
pub mod client_service;
pub mod installment_service;
pub mod models;
pub mod transaction_service;
pub mod user_service;

pub use balance_service::{BalanceService, UserSummary};
pub use client_service::ClientService;
pub use installment_service::InstallmentService;
pub use transaction_service::TransactionService;
pub use user_service::UserService;

//! Balance aggregation for the ledger core.
//!
//! The cached balances on clients and users are derived state; this service
//! recomputes them from the transaction set. Recomputation is the source of
//! truth, and `validate_balances` cross-checks every cache against it.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::models::money;
use crate::error::{LedgerError, Result};
use crate::storage::{ClientRepository, LedgerDb, TransactionRepository, UserRepository};

/// Dashboard totals for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub total_balance: Decimal,
    pub total_received: Decimal,
    pub total_given: Decimal,
}

#[derive(Clone)]
pub struct BalanceService {
    transactions: TransactionRepository,
    clients: ClientRepository,
    users: UserRepository,
}

impl BalanceService {
    pub fn new(db: LedgerDb) -> Self {
        Self {
            transactions: TransactionRepository::new(db.clone()),
            clients: ClientRepository::new(db.clone()),
            users: UserRepository::new(db),
        }
    }

    /// Recompute a client's balance from its transactions: received counts
    /// positive, given negative.
    pub async fn compute_client_balance(&self, user_id: &str, client_id: &str) -> Result<Decimal> {
        match self.clients.get_client(client_id).await? {
            None => return Err(LedgerError::NotFound("client")),
            Some(client) if client.user_id != user_id => {
                return Err(LedgerError::Unauthorized("client"))
            }
            Some(_) => {}
        }

        let cents = self.transactions.sum_client_cents(client_id).await?;
        Ok(money::from_cents(cents))
    }

    /// Recompute a user's aggregate balance from every transaction across
    /// their clients.
    pub async fn compute_user_balance(&self, user_id: &str) -> Result<Decimal> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(LedgerError::NotFound("user"));
        }

        let cents = self.transactions.sum_user_cents(user_id).await?;
        Ok(money::from_cents(cents))
    }

    /// Dashboard totals: aggregate balance plus unsigned received/given sums.
    pub async fn user_summary(&self, user_id: &str) -> Result<UserSummary> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(LedgerError::NotFound("user"));
        }

        let balance_cents = self.transactions.sum_user_cents(user_id).await?;
        let (received_cents, given_cents) = self.transactions.sum_user_by_kind(user_id).await?;

        Ok(UserSummary {
            total_balance: money::from_cents(balance_cents),
            total_received: money::from_cents(received_cents),
            total_given: money::from_cents(given_cents),
        })
    }

    /// Validate every cached balance of a user against recomputation.
    /// Returns a description of each mismatch found; empty means consistent.
    pub async fn validate_balances(&self, user_id: &str) -> Result<Vec<String>> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(LedgerError::NotFound("user"))?;

        let mut errors = Vec::new();
        let clients = self.clients.list_clients(user_id).await?;

        let mut client_total = Decimal::ZERO;
        for client in &clients {
            let recomputed = money::from_cents(self.transactions.sum_client_cents(&client.id).await?);
            client_total += client.balance;

            if client.balance != recomputed {
                let error = format!(
                    "Client {} has incorrect balance: expected {}, cached {}",
                    client.id, recomputed, client.balance
                );
                warn!("Balance validation error: {}", error);
                errors.push(error);
            }
        }

        if user.balance != client_total {
            let error = format!(
                "User {} aggregate does not match client balances: expected {}, cached {}",
                user.id, client_total, user.balance
            );
            warn!("Balance validation error: {}", error);
            errors.push(error);
        }

        if errors.is_empty() {
            info!("All balances are consistent for user {}", user_id);
        }

        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client_service::ClientService;
    use crate::domain::models::TransactionKind;
    use crate::domain::transaction_service::TransactionService;
    use crate::domain::user_service::UserService;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn setup() -> (LedgerDb, BalanceService, TransactionService, String, String) {
        let db = LedgerDb::init_test().await.unwrap();
        let user = UserService::new(db.clone()).create_user("Asha", "555-0101").await.unwrap();
        let client = ClientService::new(db.clone())
            .create_client(&user.id, "Arun", "555-2")
            .await
            .unwrap();
        (
            db.clone(),
            BalanceService::new(db.clone()),
            TransactionService::new(db),
            user.id,
            client.id,
        )
    }

    #[tokio::test]
    async fn test_cache_matches_recomputation_after_each_mutation() {
        let (_db, balances, transactions, user_id, client_id) = setup().await;

        let steps = [
            ("100.00", TransactionKind::Received),
            ("30.00", TransactionKind::Given),
            ("12.34", TransactionKind::Received),
        ];

        for (amount, kind) in steps {
            transactions
                .apply_transaction(&user_id, &client_id, dec(amount), kind, "step", Utc::now())
                .await
                .unwrap();

            let errors = balances.validate_balances(&user_id).await.unwrap();
            assert!(errors.is_empty(), "balance drift after {amount}: {errors:?}");
        }

        assert_eq!(
            balances.compute_client_balance(&user_id, &client_id).await.unwrap(),
            dec("82.34")
        );
    }

    #[tokio::test]
    async fn test_user_balance_spans_clients() {
        let (db, balances, transactions, user_id, client_a) = setup().await;
        let client_b = ClientService::new(db.clone())
            .create_client(&user_id, "Zoya", "555-3")
            .await
            .unwrap();

        transactions
            .apply_transaction(&user_id, &client_a, dec("100.00"), TransactionKind::Received, "a", Utc::now())
            .await
            .unwrap();
        transactions
            .apply_transaction(&user_id, &client_b.id, dec("40.00"), TransactionKind::Given, "b", Utc::now())
            .await
            .unwrap();

        assert_eq!(balances.compute_user_balance(&user_id).await.unwrap(), dec("60.00"));

        let errors = balances.validate_balances(&user_id).await.unwrap();
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_user_summary_totals() {
        let (_db, balances, transactions, user_id, client_id) = setup().await;

        transactions
            .apply_transaction(&user_id, &client_id, dec("100.00"), TransactionKind::Received, "a", Utc::now())
            .await
            .unwrap();
        transactions
            .apply_transaction(&user_id, &client_id, dec("25.00"), TransactionKind::Received, "b", Utc::now())
            .await
            .unwrap();
        transactions
            .apply_transaction(&user_id, &client_id, dec("40.00"), TransactionKind::Given, "c", Utc::now())
            .await
            .unwrap();

        let summary = balances.user_summary(&user_id).await.unwrap();
        assert_eq!(summary.total_received, dec("125.00"));
        assert_eq!(summary.total_given, dec("40.00"));
        assert_eq!(summary.total_balance, dec("85.00"));
    }

    #[tokio::test]
    async fn test_validate_detects_corrupted_cache() {
        let (db, balances, transactions, user_id, client_id) = setup().await;

        transactions
            .apply_transaction(&user_id, &client_id, dec("100.00"), TransactionKind::Received, "a", Utc::now())
            .await
            .unwrap();

        // Corrupt the cached client balance behind the service's back.
        sqlx::query("UPDATE clients SET balance = balance + 1 WHERE id = ?")
            .bind(&client_id)
            .execute(db.pool())
            .await
            .unwrap();

        let errors = balances.validate_balances(&user_id).await.unwrap();
        // The client cache is off, and the user aggregate no longer matches it.
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn test_compute_balance_authorization() {
        let (db, balances, _transactions, _user_id, client_id) = setup().await;
        let other = UserService::new(db.clone()).create_user("Birju", "555-0102").await.unwrap();

        let err = balances.compute_client_balance(&other.id, &client_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized("client")));

        let err = balances.compute_user_balance("user-absent").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("user")));
    }
}

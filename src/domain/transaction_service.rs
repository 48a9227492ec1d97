//! Transaction processing for the ledger core.
//!
//! Applying or reversing a transaction is one atomic unit: the row write and
//! both denormalized balances (client and owning user) commit together or
//! not at all. This is the invariant the whole core exists to protect; no
//! caller can observe a transaction row without its balance effect.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::models::money;
use crate::domain::models::{Transaction, TransactionKind};
use crate::error::{LedgerError, Result};
use crate::storage::{ClientRepository, LedgerDb, TransactionRepository};

const MAX_DESCRIPTION_LEN: usize = 256;

#[derive(Clone)]
pub struct TransactionService {
    db: LedgerDb,
    transactions: TransactionRepository,
    clients: ClientRepository,
}

impl TransactionService {
    pub fn new(db: LedgerDb) -> Self {
        Self {
            transactions: TransactionRepository::new(db.clone()),
            clients: ClientRepository::new(db.clone()),
            db,
        }
    }

    /// Record a transaction against a client and move both balance caches by
    /// its signed amount. Returns the new transaction id.
    pub async fn apply_transaction(
        &self,
        user_id: &str,
        client_id: &str,
        amount: Decimal,
        kind: TransactionKind,
        description: &str,
        date: DateTime<Utc>,
    ) -> Result<String> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if description.is_empty() || description.len() > MAX_DESCRIPTION_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "description must be between 1 and {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        let amount = money::round_money(amount);
        let amount_cents = money::to_cents(amount).ok_or(LedgerError::InvalidAmount(amount))?;
        let delta_cents = match kind {
            TransactionKind::Received => amount_cents,
            TransactionKind::Given => -amount_cents,
        };

        let transaction = Transaction {
            id: Transaction::generate_id(Utc::now().timestamp_millis()),
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            amount,
            kind,
            description: description.to_string(),
            date,
        };

        let mut unit = self.db.begin_unit().await?;

        // The guarded update doubles as the existence/ownership check.
        if !unit.adjust_client_balance(user_id, client_id, delta_cents).await? {
            unit.rollback().await?;
            return Err(self.classify_client(user_id, client_id).await?);
        }

        unit.insert_transaction(&transaction).await?;

        if !unit.adjust_user_balance(user_id, delta_cents).await? {
            unit.rollback().await?;
            return Err(LedgerError::NotFound("user"));
        }

        unit.commit().await?;

        info!(
            "Applied {} {} to client {} (transaction {})",
            kind.as_str(),
            amount,
            client_id,
            transaction.id
        );
        Ok(transaction.id)
    }

    /// Delete a transaction and apply the inverse signed delta to both
    /// balance caches, inside one unit of work.
    pub async fn reverse_transaction(&self, user_id: &str, transaction_id: &str) -> Result<()> {
        let mut unit = self.db.begin_unit().await?;

        let transaction = match unit.delete_transaction_returning(user_id, transaction_id).await? {
            Some(transaction) => transaction,
            None => {
                unit.rollback().await?;
                return match self.transactions.get_transaction(transaction_id).await? {
                    None => Err(LedgerError::NotFound("transaction")),
                    Some(_) => Err(LedgerError::Unauthorized("transaction")),
                };
            }
        };

        let inverse_cents = -money::to_cents(transaction.signed_amount())
            .ok_or(LedgerError::InvalidAmount(transaction.amount))?;

        if !unit
            .adjust_client_balance(user_id, &transaction.client_id, inverse_cents)
            .await?
        {
            unit.rollback().await?;
            return Err(LedgerError::NotFound("client"));
        }

        if !unit.adjust_user_balance(user_id, inverse_cents).await? {
            unit.rollback().await?;
            return Err(LedgerError::NotFound("user"));
        }

        unit.commit().await?;

        info!("Reversed transaction {} for client {}", transaction_id, transaction.client_id);
        Ok(())
    }

    /// List a client's transactions, most recent first.
    pub async fn list_transactions(&self, user_id: &str, client_id: &str) -> Result<Vec<Transaction>> {
        self.authorize_client(user_id, client_id).await?;
        self.transactions.list_transactions(client_id).await
    }

    /// List every transaction of a user across all clients, most recent first.
    pub async fn list_all_transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        self.transactions.list_all_transactions(user_id).await
    }

    async fn authorize_client(&self, user_id: &str, client_id: &str) -> Result<()> {
        match self.clients.get_client(client_id).await? {
            None => Err(LedgerError::NotFound("client")),
            Some(client) if client.user_id != user_id => Err(LedgerError::Unauthorized("client")),
            Some(_) => Ok(()),
        }
    }

    /// Classify a failed guarded balance update into NotFound/Unauthorized.
    async fn classify_client(&self, user_id: &str, client_id: &str) -> Result<LedgerError> {
        Ok(match self.clients.get_client(client_id).await? {
            None => LedgerError::NotFound("client"),
            Some(client) if client.user_id != user_id => LedgerError::Unauthorized("client"),
            // The row reappeared for this user: a concurrent writer raced us.
            Some(_) => LedgerError::NotFound("client"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client_service::ClientService;
    use crate::domain::user_service::UserService;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn setup() -> (LedgerDb, TransactionService, String, String) {
        let db = LedgerDb::init_test().await.unwrap();
        let user = UserService::new(db.clone()).create_user("Asha", "555-0101").await.unwrap();
        let client = ClientService::new(db.clone())
            .create_client(&user.id, "Arun", "555-2")
            .await
            .unwrap();
        (db.clone(), TransactionService::new(db), user.id, client.id)
    }

    async fn client_balance(db: &LedgerDb, client_id: &str) -> Decimal {
        ClientRepository::new(db.clone())
            .get_client(client_id)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    async fn user_balance(db: &LedgerDb, user_id: &str) -> Decimal {
        UserService::new(db.clone()).get_user(user_id).await.unwrap().balance
    }

    #[tokio::test]
    async fn test_apply_updates_both_caches() {
        let (db, service, user_id, client_id) = setup().await;

        service
            .apply_transaction(&user_id, &client_id, dec("50.00"), TransactionKind::Received, "Opening", Utc::now())
            .await
            .unwrap();
        service
            .apply_transaction(&user_id, &client_id, dec("200.00"), TransactionKind::Received, "Loan repaid", Utc::now())
            .await
            .unwrap();

        assert_eq!(client_balance(&db, &client_id).await, dec("250.00"));
        assert_eq!(user_balance(&db, &user_id).await, dec("250.00"));

        service
            .apply_transaction(&user_id, &client_id, dec("30.00"), TransactionKind::Given, "Goods", Utc::now())
            .await
            .unwrap();

        assert_eq!(client_balance(&db, &client_id).await, dec("220.00"));
        assert_eq!(user_balance(&db, &user_id).await, dec("220.00"));
    }

    #[tokio::test]
    async fn test_apply_rejects_non_positive_amount() {
        let (_db, service, user_id, client_id) = setup().await;

        for bad in ["0", "-5.00"] {
            let err = service
                .apply_transaction(&user_id, &client_id, dec(bad), TransactionKind::Received, "x", Utc::now())
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount(_)));
        }
    }

    #[tokio::test]
    async fn test_apply_rejects_bad_description() {
        let (_db, service, user_id, client_id) = setup().await;

        let err = service
            .apply_transaction(&user_id, &client_id, dec("1.00"), TransactionKind::Received, "", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let long = "x".repeat(257);
        let err = service
            .apply_transaction(&user_id, &client_id, dec("1.00"), TransactionKind::Received, &long, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_apply_to_missing_or_foreign_client() {
        let (db, service, user_id, client_id) = setup().await;

        let err = service
            .apply_transaction(&user_id, "client-absent", dec("1.00"), TransactionKind::Received, "x", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("client")));

        let other = UserService::new(db.clone()).create_user("Birju", "555-0102").await.unwrap();
        let err = service
            .apply_transaction(&other.id, &client_id, dec("1.00"), TransactionKind::Received, "x", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized("client")));

        // Nothing was written on either failure path.
        assert!(service.list_all_transactions(&user_id).await.unwrap().is_empty());
        assert_eq!(user_balance(&db, &user_id).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_reverse_round_trip_restores_balance() {
        let (db, service, user_id, client_id) = setup().await;

        service
            .apply_transaction(&user_id, &client_id, dec("120.00"), TransactionKind::Received, "Opening", Utc::now())
            .await
            .unwrap();
        let id = service
            .apply_transaction(&user_id, &client_id, dec("45.50"), TransactionKind::Given, "Goods", Utc::now())
            .await
            .unwrap();
        assert_eq!(client_balance(&db, &client_id).await, dec("74.50"));

        service.reverse_transaction(&user_id, &id).await.unwrap();
        assert_eq!(client_balance(&db, &client_id).await, dec("120.00"));
        assert_eq!(user_balance(&db, &user_id).await, dec("120.00"));

        // Re-applying with identical arguments lands back where we were.
        service
            .apply_transaction(&user_id, &client_id, dec("45.50"), TransactionKind::Given, "Goods", Utc::now())
            .await
            .unwrap();
        assert_eq!(client_balance(&db, &client_id).await, dec("74.50"));
        assert_eq!(user_balance(&db, &user_id).await, dec("74.50"));
    }

    #[tokio::test]
    async fn test_reverse_missing_and_foreign() {
        let (db, service, user_id, client_id) = setup().await;

        let err = service.reverse_transaction(&user_id, "txn-absent").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("transaction")));

        let id = service
            .apply_transaction(&user_id, &client_id, dec("10.00"), TransactionKind::Received, "x", Utc::now())
            .await
            .unwrap();
        let other = UserService::new(db.clone()).create_user("Birju", "555-0102").await.unwrap();
        let err = service.reverse_transaction(&other.id, &id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized("transaction")));

        // The transaction survived the unauthorized attempt.
        assert_eq!(client_balance(&db, &client_id).await, dec("10.00"));
    }

    #[tokio::test]
    async fn test_concurrent_applies_lose_no_update() {
        let (db, service, user_id, client_id) = setup().await;

        service
            .apply_transaction(&user_id, &client_id, dec("50.00"), TransactionKind::Received, "Opening", Utc::now())
            .await
            .unwrap();

        let s1 = service.clone();
        let s2 = service.clone();
        let (u1, c1) = (user_id.clone(), client_id.clone());
        let (u2, c2) = (user_id.clone(), client_id.clone());

        let a = tokio::spawn(async move {
            s1.apply_transaction(&u1, &c1, dec("200.00"), TransactionKind::Received, "Repayment", Utc::now())
                .await
        });
        let b = tokio::spawn(async move {
            s2.apply_transaction(&u2, &c2, dec("30.00"), TransactionKind::Given, "Goods", Utc::now())
                .await
        });

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // 50 + 200 - 30, regardless of commit order.
        assert_eq!(client_balance(&db, &client_id).await, dec("220.00"));
        assert_eq!(user_balance(&db, &user_id).await, dec("220.00"));
    }

    #[tokio::test]
    async fn test_list_transactions_recent_first() {
        let (_db, service, user_id, client_id) = setup().await;

        let early = Utc::now() - chrono::Duration::days(2);
        let late = Utc::now();
        service
            .apply_transaction(&user_id, &client_id, dec("10.00"), TransactionKind::Received, "Old", early)
            .await
            .unwrap();
        service
            .apply_transaction(&user_id, &client_id, dec("20.00"), TransactionKind::Given, "New", late)
            .await
            .unwrap();

        let listed = service.list_transactions(&user_id, &client_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].description, "New");
        assert_eq!(listed[1].description, "Old");
    }
}

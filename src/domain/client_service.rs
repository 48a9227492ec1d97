//! Client management for the ledger core.
//!
//! Deleting a client is the one mutation here that moves money: the client's
//! cascade (transactions, plans, installments) and the owner's aggregate
//! correction happen inside a single unit of work.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::models::Client;
use crate::error::{LedgerError, Result};
use crate::storage::{ClientRepository, LedgerDb, UserRepository};

#[derive(Clone)]
pub struct ClientService {
    db: LedgerDb,
    clients: ClientRepository,
    users: UserRepository,
}

impl ClientService {
    pub fn new(db: LedgerDb) -> Self {
        Self {
            clients: ClientRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            db,
        }
    }

    /// Create a client with a zero balance for an existing user.
    pub async fn create_client(&self, user_id: &str, name: &str, phone: &str) -> Result<Client> {
        if name.is_empty() {
            return Err(LedgerError::InvalidInput("client name must not be empty".to_string()));
        }
        if self.users.get_user(user_id).await?.is_none() {
            return Err(LedgerError::NotFound("user"));
        }

        let now = Utc::now();
        let client = Client {
            id: Client::generate_id(now.timestamp_millis()),
            user_id: user_id.to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };

        self.clients.store_client(&client).await?;
        info!("Created client {} for user {}", client.id, user_id);
        Ok(client)
    }

    /// Get a client, verifying it belongs to the requesting user.
    pub async fn get_client(&self, user_id: &str, client_id: &str) -> Result<Client> {
        match self.clients.get_client(client_id).await? {
            None => Err(LedgerError::NotFound("client")),
            Some(client) if client.user_id != user_id => Err(LedgerError::Unauthorized("client")),
            Some(client) => Ok(client),
        }
    }

    /// List a user's clients ordered by name.
    pub async fn list_clients(&self, user_id: &str) -> Result<Vec<Client>> {
        self.clients.list_clients(user_id).await
    }

    /// Update a client's display name and/or phone. Balances never change
    /// through this path.
    pub async fn update_client(
        &self,
        user_id: &str,
        client_id: &str,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Client> {
        if name.is_none() && phone.is_none() {
            return Err(LedgerError::InvalidInput("no fields to update".to_string()));
        }

        let current = self.get_client(user_id, client_id).await?;
        let name = name.unwrap_or(&current.name);
        let phone = phone.unwrap_or(&current.phone);

        if !self.clients.update_client(user_id, client_id, name, phone).await? {
            // The row vanished between the read and the write.
            return Err(LedgerError::NotFound("client"));
        }

        self.get_client(user_id, client_id).await
    }

    /// Delete a client and everything hanging off it, correcting the owner's
    /// aggregate balance by the client's balance at deletion time. One unit
    /// of work: either the client, its transactions, its plans and the
    /// aggregate all change, or none of them do.
    pub async fn delete_client(&self, user_id: &str, client_id: &str) -> Result<()> {
        let mut unit = self.db.begin_unit().await?;

        let balance_cents = match unit.delete_client_returning_balance(user_id, client_id).await? {
            Some(cents) => cents,
            None => {
                unit.rollback().await?;
                return match self.clients.get_client(client_id).await? {
                    None => Err(LedgerError::NotFound("client")),
                    Some(_) => Err(LedgerError::Unauthorized("client")),
                };
            }
        };

        if !unit.adjust_user_balance(user_id, -balance_cents).await? {
            unit.rollback().await?;
            return Err(LedgerError::NotFound("user"));
        }

        unit.commit().await?;
        info!("Deleted client {} for user {}", client_id, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TransactionKind;
    use crate::domain::transaction_service::TransactionService;
    use crate::domain::user_service::UserService;
    use std::str::FromStr;

    async fn setup() -> (LedgerDb, ClientService, String) {
        let db = LedgerDb::init_test().await.unwrap();
        let user = UserService::new(db.clone()).create_user("Asha", "555-0101").await.unwrap();
        (db.clone(), ClientService::new(db), user.id)
    }

    #[tokio::test]
    async fn test_create_and_list_clients_ordered_by_name() {
        let (_db, service, user_id) = setup().await;

        service.create_client(&user_id, "Zoya", "555-1").await.unwrap();
        service.create_client(&user_id, "Arun", "555-2").await.unwrap();

        let clients = service.list_clients(&user_id).await.unwrap();
        let names: Vec<&str> = clients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Arun", "Zoya"]);
    }

    #[tokio::test]
    async fn test_create_client_for_missing_user() {
        let (_db, service, _user_id) = setup().await;

        let err = service.create_client("user-absent", "Arun", "555-2").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("user")));
    }

    #[tokio::test]
    async fn test_get_client_authorization() {
        let (db, service, user_id) = setup().await;
        let other = UserService::new(db.clone()).create_user("Birju", "555-0102").await.unwrap();

        let client = service.create_client(&user_id, "Arun", "555-2").await.unwrap();

        let err = service.get_client(&other.id, &client.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized("client")));

        let err = service.get_client(&user_id, "client-absent").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("client")));
    }

    #[tokio::test]
    async fn test_update_client_fields() {
        let (_db, service, user_id) = setup().await;
        let client = service.create_client(&user_id, "Arun", "555-2").await.unwrap();

        let updated = service
            .update_client(&user_id, &client.id, Some("Arun K"), None)
            .await
            .unwrap();
        assert_eq!(updated.name, "Arun K");
        assert_eq!(updated.phone, "555-2");

        let err = service
            .update_client(&user_id, &client.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_client_corrects_user_aggregate() {
        let (db, service, user_id) = setup().await;
        let client = service.create_client(&user_id, "Arun", "555-2").await.unwrap();

        // Drive the client balance to -75.00.
        let transactions = TransactionService::new(db.clone());
        transactions
            .apply_transaction(
                &user_id,
                &client.id,
                Decimal::from_str("75.00").unwrap(),
                TransactionKind::Given,
                "Advance",
                Utc::now(),
            )
            .await
            .unwrap();

        let user = UserService::new(db.clone()).get_user(&user_id).await.unwrap();
        assert_eq!(user.balance, Decimal::from_str("-75.00").unwrap());

        service.delete_client(&user_id, &client.id).await.unwrap();

        // Removing a -75.00 client raises the aggregate by exactly 75.00.
        let user = UserService::new(db.clone()).get_user(&user_id).await.unwrap();
        assert_eq!(user.balance, Decimal::ZERO);

        // The cascade removed the client's transactions as well.
        let remaining = crate::storage::TransactionRepository::new(db.clone())
            .list_all_transactions(&user_id)
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_delete_client_unauthorized() {
        let (db, service, user_id) = setup().await;
        let other = UserService::new(db.clone()).create_user("Birju", "555-0102").await.unwrap();
        let client = service.create_client(&user_id, "Arun", "555-2").await.unwrap();

        let err = service.delete_client(&other.id, &client.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized("client")));

        // The client is still there for its real owner.
        assert!(service.get_client(&user_id, &client.id).await.is_ok());
    }
}

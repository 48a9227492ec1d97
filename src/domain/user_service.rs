//! User management for the ledger core.
//!
//! Registration itself (OTP issuance and verification) lives with the HTTP
//! collaborator; this service only creates and reads the ledger-side row.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::models::User;
use crate::error::{LedgerError, Result};
use crate::storage::{LedgerDb, UserRepository};

#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
}

impl UserService {
    pub fn new(db: LedgerDb) -> Self {
        Self {
            users: UserRepository::new(db),
        }
    }

    /// Create a user with a zero aggregate balance.
    pub async fn create_user(&self, name: &str, phone: &str) -> Result<User> {
        if name.is_empty() {
            return Err(LedgerError::InvalidInput("user name must not be empty".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: User::generate_id(now.timestamp_millis()),
            name: name.to_string(),
            phone: phone.to_string(),
            balance: Decimal::ZERO,
            created_at: now,
        };

        self.users.store_user(&user).await?;
        info!("Created user {}", user.id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or(LedgerError::NotFound("user"))
    }
}

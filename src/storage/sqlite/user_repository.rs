//! Repository for user rows.

use sqlx::Row;

use crate::domain::models::money;
use crate::domain::models::User;
use crate::error::Result;

use super::{parse_timestamp, LedgerDb};

#[derive(Clone)]
pub struct UserRepository {
    db: LedgerDb,
}

impl UserRepository {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }

    /// Store a user in the database.
    pub async fn store_user(&self, user: &User) -> Result<()> {
        let balance_cents = money::to_cents(user.balance).unwrap_or(0);

        sqlx::query(
            r#"
            INSERT INTO users (id, name, phone, balance, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(balance_cents)
        .bind(user.created_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, phone, balance, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(User {
                id: r.get("id"),
                name: r.get("name"),
                phone: r.get("phone"),
                balance: money::from_cents(r.get("balance")),
                created_at: parse_timestamp(r.get::<String, _>("created_at").as_str())?,
            })),
            None => Ok(None),
        }
    }
}

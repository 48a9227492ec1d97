//! Repository for client rows.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::money;
use crate::domain::models::Client;
use crate::error::Result;

use super::{parse_timestamp, LedgerDb};

#[derive(Clone)]
pub struct ClientRepository {
    db: LedgerDb,
}

fn map_client_row(row: &SqliteRow) -> Result<Client> {
    Ok(Client {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        phone: row.get("phone"),
        balance: money::from_cents(row.get("balance")),
        created_at: parse_timestamp(row.get::<String, _>("created_at").as_str())?,
        updated_at: parse_timestamp(row.get::<String, _>("updated_at").as_str())?,
    })
}

impl ClientRepository {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }

    /// Store a client in the database.
    pub async fn store_client(&self, client: &Client) -> Result<()> {
        let balance_cents = money::to_cents(client.balance).unwrap_or(0);

        sqlx::query(
            r#"
            INSERT INTO clients (id, user_id, name, phone, balance, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&client.id)
        .bind(&client.user_id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(balance_cents)
        .bind(client.created_at.to_rfc3339())
        .bind(client.updated_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get a client by ID, regardless of owner. Authorization is the
    /// service layer's job.
    pub async fn get_client(&self, client_id: &str) -> Result<Option<Client>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, phone, balance, created_at, updated_at
            FROM clients
            WHERE id = ?
            "#,
        )
        .bind(client_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(map_client_row(&r)?)),
            None => Ok(None),
        }
    }

    /// List a user's clients ordered by name.
    pub async fn list_clients(&self, user_id: &str) -> Result<Vec<Client>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, phone, balance, created_at, updated_at
            FROM clients
            WHERE user_id = ?
            ORDER BY name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_client_row).collect()
    }

    /// Update a client's display fields, scoped to the owning user.
    /// Returns false when no row matched.
    pub async fn update_client(
        &self,
        user_id: &str,
        client_id: &str,
        name: &str,
        phone: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = ?, phone = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(name)
        .bind(phone)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(client_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

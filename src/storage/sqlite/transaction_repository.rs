//! Repository for transaction rows and the balance aggregation queries.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::money;
use crate::domain::models::{Transaction, TransactionKind};
use crate::error::{LedgerError, Result};

use super::{parse_timestamp, LedgerDb};

#[derive(Clone)]
pub struct TransactionRepository {
    db: LedgerDb,
}

pub(crate) fn map_transaction_row(row: &SqliteRow) -> Result<Transaction> {
    let kind_text: String = row.get("kind");
    let kind = TransactionKind::parse(&kind_text).ok_or_else(|| {
        LedgerError::Storage(sqlx::Error::Decode(
            format!("unknown transaction kind: {kind_text}").into(),
        ))
    })?;

    Ok(Transaction {
        id: row.get("id"),
        client_id: row.get("client_id"),
        user_id: row.get("user_id"),
        amount: money::from_cents(row.get("amount")),
        kind,
        description: row.get("description"),
        date: parse_timestamp(row.get::<String, _>("date").as_str())?,
    })
}

impl TransactionRepository {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }

    /// Get a transaction by ID, regardless of owner.
    pub async fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, client_id, user_id, amount, kind, description, date
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(map_transaction_row(&r)?)),
            None => Ok(None),
        }
    }

    /// List a client's transactions, most recent first.
    pub async fn list_transactions(&self, client_id: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_id, user_id, amount, kind, description, date
            FROM transactions
            WHERE client_id = ?
            ORDER BY date DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_transaction_row).collect()
    }

    /// List every transaction of a user across all clients, most recent first.
    pub async fn list_all_transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_id, user_id, amount, kind, description, date
            FROM transactions
            WHERE user_id = ?
            ORDER BY date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_transaction_row).collect()
    }

    /// Signed sum in cents over one client's transactions.
    pub async fn sum_client_cents(&self, client_id: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(CASE WHEN kind = 'received' THEN amount ELSE -amount END), 0) AS total
            FROM transactions
            WHERE client_id = ?
            "#,
        )
        .bind(client_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.get("total"))
    }

    /// Signed sum in cents over every transaction of a user.
    pub async fn sum_user_cents(&self, user_id: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(CASE WHEN kind = 'received' THEN amount ELSE -amount END), 0) AS total
            FROM transactions
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.get("total"))
    }

    /// Unsigned totals in cents per transaction kind for a user.
    /// Returns `(received, given)`.
    pub async fn sum_user_by_kind(&self, user_id: &str) -> Result<(i64, i64)> {
        let rows = sqlx::query(
            r#"
            SELECT kind, COALESCE(SUM(amount), 0) AS total
            FROM transactions
            WHERE user_id = ?
            GROUP BY kind
            "#,
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut received = 0;
        let mut given = 0;
        for row in rows {
            let kind: String = row.get("kind");
            match kind.as_str() {
                "received" => received = row.get("total"),
                "given" => given = row.get("total"),
                _ => {}
            }
        }

        Ok((received, given))
    }
}

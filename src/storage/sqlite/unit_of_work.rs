//! Atomic units of work against the ledger store.
//!
//! Every operation that touches more than one row (a transaction plus the
//! balances it moves, a plan plus its installments, a client plus its
//! cascade) goes through one `UnitOfWork`. Committing publishes all of it at
//! once; dropping the unit without committing rolls everything back.
//!
//! Balance maintenance is a relative `balance = balance + ?` update in
//! integer cents, executed inside the same database transaction as the row
//! write it belongs to. SQLite serializes writers, so concurrent units on the
//! same client cannot lose an update.

use sqlx::{Row, Sqlite, Transaction as SqlxTransaction};

use crate::domain::models::money;
use crate::domain::models::{Installment, InstallmentPlan, Transaction};
use crate::error::{LedgerError, Result};

use super::LedgerDb;

/// A single all-or-nothing group of storage writes.
pub struct UnitOfWork {
    tx: SqlxTransaction<'static, Sqlite>,
}

impl LedgerDb {
    /// Begin a new atomic unit of work.
    pub async fn begin_unit(&self) -> Result<UnitOfWork> {
        let tx = self.pool().begin().await?;
        Ok(UnitOfWork { tx })
    }
}

impl UnitOfWork {
    /// Make every write in this unit visible at once.
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Explicitly discard every write in this unit. Dropping the unit has
    /// the same effect.
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    /// Adjust a client's cached balance by a signed delta in cents, guarded
    /// on ownership. Returns false when no row matched (client absent or
    /// owned by a different user); the caller must roll back and classify.
    pub async fn adjust_client_balance(
        &mut self,
        user_id: &str,
        client_id: &str,
        delta_cents: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET balance = balance + ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(delta_cents)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(client_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adjust a user's cached aggregate balance by a signed delta in cents.
    pub async fn adjust_user_balance(&mut self, user_id: &str, delta_cents: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET balance = balance + ?
            WHERE id = ?
            "#,
        )
        .bind(delta_cents)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a transaction row.
    pub async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        let amount_cents = money::to_cents(transaction.amount)
            .ok_or(LedgerError::InvalidAmount(transaction.amount))?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, client_id, user_id, amount, kind, description, date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.client_id)
        .bind(&transaction.user_id)
        .bind(amount_cents)
        .bind(transaction.kind.as_str())
        .bind(&transaction.description)
        .bind(transaction.date.to_rfc3339())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Delete a transaction row, returning it so its balance effect can be
    /// reversed inside the same unit. Returns `None` when the transaction is
    /// absent or belongs to a different user.
    pub async fn delete_transaction_returning(
        &mut self,
        user_id: &str,
        transaction_id: &str,
    ) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            DELETE FROM transactions
            WHERE id = ? AND user_id = ?
            RETURNING id, client_id, user_id, amount, kind, description, date
            "#,
        )
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(r) => Ok(Some(super::transaction_repository::map_transaction_row(&r)?)),
            None => Ok(None),
        }
    }

    /// Delete a client row, returning its cached balance in cents. The
    /// foreign keys cascade the deletion down to transactions, plans and
    /// installments within the same transaction. Returns `None` when the
    /// client is absent or owned by a different user.
    pub async fn delete_client_returning_balance(
        &mut self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<i64>> {
        let row = sqlx::query(
            r#"
            DELETE FROM clients
            WHERE id = ? AND user_id = ?
            RETURNING balance
            "#,
        )
        .bind(client_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|r| r.get("balance")))
    }

    /// Insert a plan row, guarded on client ownership. Returns false (and
    /// inserts nothing) when the client is absent or owned by another user.
    pub async fn insert_plan_guarded(
        &mut self,
        user_id: &str,
        plan: &InstallmentPlan,
    ) -> Result<bool> {
        let total_cents = money::to_cents(plan.total_amount)
            .ok_or(LedgerError::InvalidAmount(plan.total_amount))?;

        let result = sqlx::query(
            r#"
            INSERT INTO installment_plans (id, client_id, total_amount, months, start_date, created_at)
            SELECT ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM clients WHERE id = ? AND user_id = ?)
            "#,
        )
        .bind(&plan.id)
        .bind(&plan.client_id)
        .bind(total_cents)
        .bind(plan.months as i64)
        .bind(plan.start_date.format("%Y-%m-%d").to_string())
        .bind(plan.created_at.to_rfc3339())
        .bind(&plan.client_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert one installment row of a plan.
    pub async fn insert_installment(&mut self, installment: &Installment) -> Result<()> {
        let amount_cents = money::to_cents(installment.amount)
            .ok_or(LedgerError::InvalidAmount(installment.amount))?;

        sqlx::query(
            r#"
            INSERT INTO installments (id, plan_id, month_year, amount, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&installment.id)
        .bind(&installment.plan_id)
        .bind(&installment.month_year)
        .bind(amount_cents)
        .bind(installment.status.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Flip a pending installment to Paid, scoped to the owning user.
    /// Returns false when nothing matched: absent, already paid, or foreign.
    pub async fn mark_installment_paid(
        &mut self,
        user_id: &str,
        installment_id: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE installments
            SET status = 'Paid'
            WHERE id = ? AND status = 'Pending'
              AND plan_id IN (
                  SELECT p.id
                  FROM installment_plans p
                  JOIN clients c ON p.client_id = c.id
                  WHERE c.user_id = ?
              )
            "#,
        )
        .bind(installment_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Amount in cents, month label, and client id for an installment, read
    /// inside this unit. Used when a payment transaction is recorded
    /// alongside the status flip.
    pub async fn installment_payment_context(
        &mut self,
        installment_id: &str,
    ) -> Result<Option<(i64, String, String)>> {
        let row = sqlx::query(
            r#"
            SELECT i.amount, i.month_year, p.client_id
            FROM installments i
            JOIN installment_plans p ON i.plan_id = p.id
            WHERE i.id = ?
            "#,
        )
        .bind(installment_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|r| (r.get("amount"), r.get("month_year"), r.get("client_id"))))
    }
}

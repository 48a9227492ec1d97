//! Repository for installment plan and installment rows.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::money;
use crate::domain::models::{Installment, InstallmentPlan, InstallmentStatus};
use crate::error::{LedgerError, Result};

use super::{parse_date, parse_timestamp, LedgerDb};

#[derive(Clone)]
pub struct InstallmentRepository {
    db: LedgerDb,
}

fn map_plan_row(row: &SqliteRow) -> Result<InstallmentPlan> {
    Ok(InstallmentPlan {
        id: row.get("id"),
        client_id: row.get("client_id"),
        total_amount: money::from_cents(row.get("total_amount")),
        months: row.get::<i64, _>("months") as u32,
        start_date: parse_date(row.get::<String, _>("start_date").as_str())?,
        created_at: parse_timestamp(row.get::<String, _>("created_at").as_str())?,
    })
}

fn map_installment_row(row: &SqliteRow) -> Result<Installment> {
    let status_text: String = row.get("status");
    let status = InstallmentStatus::parse(&status_text).ok_or_else(|| {
        LedgerError::Storage(sqlx::Error::Decode(
            format!("unknown installment status: {status_text}").into(),
        ))
    })?;

    Ok(Installment {
        id: row.get("id"),
        plan_id: row.get("plan_id"),
        month_year: row.get("month_year"),
        amount: money::from_cents(row.get("amount")),
        status,
    })
}

impl InstallmentRepository {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }

    /// Get a plan by ID, regardless of owner.
    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<InstallmentPlan>> {
        let row = sqlx::query(
            r#"
            SELECT id, client_id, total_amount, months, start_date, created_at
            FROM installment_plans
            WHERE id = ?
            "#,
        )
        .bind(plan_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(map_plan_row(&r)?)),
            None => Ok(None),
        }
    }

    /// List a client's plans in creation order.
    pub async fn list_plans(&self, client_id: &str) -> Result<Vec<InstallmentPlan>> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_id, total_amount, months, start_date, created_at
            FROM installment_plans
            WHERE client_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(client_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_plan_row).collect()
    }

    /// List a plan's installments by due month ascending. Month labels are
    /// unique per plan, so no further tie-break is needed.
    pub async fn list_installments(&self, plan_id: &str) -> Result<Vec<Installment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, plan_id, month_year, amount, status
            FROM installments
            WHERE plan_id = ?
            ORDER BY month_year ASC
            "#,
        )
        .bind(plan_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_installment_row).collect()
    }

    /// List a client's pending installments across all plans, earliest due
    /// month first.
    pub async fn list_pending(&self, client_id: &str) -> Result<Vec<Installment>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.plan_id, i.month_year, i.amount, i.status
            FROM installments i
            JOIN installment_plans p ON i.plan_id = p.id
            WHERE i.status = 'Pending' AND p.client_id = ?
            ORDER BY i.month_year ASC
            "#,
        )
        .bind(client_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_installment_row).collect()
    }

    /// Get an installment together with the id of the user owning it, for
    /// error classification on the mark-paid failure path.
    pub async fn get_installment_with_owner(
        &self,
        installment_id: &str,
    ) -> Result<Option<(Installment, String)>> {
        let row = sqlx::query(
            r#"
            SELECT i.id, i.plan_id, i.month_year, i.amount, i.status, c.user_id AS owner_id
            FROM installments i
            JOIN installment_plans p ON i.plan_id = p.id
            JOIN clients c ON p.client_id = c.id
            WHERE i.id = ?
            "#,
        )
        .bind(installment_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => {
                let owner: String = r.get("owner_id");
                Ok(Some((map_installment_row(&r)?, owner)))
            }
            None => Ok(None),
        }
    }
}

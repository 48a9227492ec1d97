//! Installment plan generation and payment tracking.
//!
//! A plan decomposes a total receivable into monthly dues. All installments
//! carry the rounded per-month amount except the last, which absorbs the
//! rounding remainder so the schedule sums exactly to the total. The plan
//! row and its installments are inserted in one unit of work; a plan with
//! fewer than its declared months is never observable.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::calendar;
use crate::domain::models::money;
use crate::domain::models::{
    Installment, InstallmentPlan, InstallmentStatus, Transaction, TransactionKind,
};
use crate::error::{LedgerError, Result};
use crate::storage::{ClientRepository, InstallmentRepository, LedgerDb};

#[derive(Clone)]
pub struct InstallmentService {
    db: LedgerDb,
    installments: InstallmentRepository,
    clients: ClientRepository,
    /// When set, marking an installment paid also records a `received`
    /// transaction for its amount in the same unit of work. Off by default;
    /// the linkage is a caller policy, not a ledger invariant.
    record_payment_transaction: bool,
}

impl InstallmentService {
    pub fn new(db: LedgerDb) -> Self {
        Self {
            installments: InstallmentRepository::new(db.clone()),
            clients: ClientRepository::new(db.clone()),
            db,
            record_payment_transaction: false,
        }
    }

    /// Enable recording a ledger transaction whenever an installment is paid.
    pub fn with_payment_recording(mut self) -> Self {
        self.record_payment_transaction = true;
        self
    }

    /// Create a plan and its full amortization schedule. Returns the plan id.
    pub async fn create_plan(
        &self,
        user_id: &str,
        client_id: &str,
        total_amount: Decimal,
        months: u32,
        start_date: NaiveDate,
    ) -> Result<String> {
        if total_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(total_amount));
        }
        if months < 1 {
            return Err(LedgerError::InvalidInput("months must be at least 1".to_string()));
        }

        let total_amount = money::round_money(total_amount);
        let per_month = money::round_money(total_amount / Decimal::from(months));
        let last = total_amount - per_month * Decimal::from(months - 1);
        if last < Decimal::ZERO {
            return Err(LedgerError::InvalidInput(
                "total amount is too small to spread across the requested months".to_string(),
            ));
        }

        let now = Utc::now();
        let plan = InstallmentPlan {
            id: InstallmentPlan::generate_id(now.timestamp_millis()),
            client_id: client_id.to_string(),
            total_amount,
            months,
            start_date,
            created_at: now,
        };

        let mut schedule = Vec::with_capacity(months as usize);
        for i in 0..months {
            let due = calendar::add_months(start_date, i).ok_or_else(|| {
                LedgerError::InvalidInput("start date is out of calendar range".to_string())
            })?;
            let amount = if i == months - 1 { last } else { per_month };
            schedule.push(Installment {
                id: Installment::generate_id(now.timestamp_millis()),
                plan_id: plan.id.clone(),
                month_year: calendar::month_label(due),
                amount,
                status: InstallmentStatus::Pending,
            });
        }

        let mut unit = self.db.begin_unit().await?;

        if !unit.insert_plan_guarded(user_id, &plan).await? {
            unit.rollback().await?;
            return match self.clients.get_client(client_id).await? {
                None => Err(LedgerError::NotFound("client")),
                Some(_) => Err(LedgerError::Unauthorized("client")),
            };
        }

        for installment in &schedule {
            unit.insert_installment(installment).await?;
        }

        unit.commit().await?;

        info!(
            "Created plan {} for client {}: {} over {} months from {}",
            plan.id, client_id, total_amount, months, start_date
        );
        Ok(plan.id)
    }

    /// Transition an installment Pending → Paid. Fails with `AlreadyPaid`
    /// when the transition happened before, `NotFound`/`Unauthorized` when
    /// the installment is absent or foreign.
    pub async fn mark_installment_paid(&self, user_id: &str, installment_id: &str) -> Result<()> {
        let mut unit = self.db.begin_unit().await?;

        if !unit.mark_installment_paid(user_id, installment_id).await? {
            unit.rollback().await?;
            return match self.installments.get_installment_with_owner(installment_id).await? {
                None => Err(LedgerError::NotFound("installment")),
                Some((_, owner)) if owner != user_id => Err(LedgerError::Unauthorized("installment")),
                Some((installment, _)) if installment.status == InstallmentStatus::Paid => {
                    Err(LedgerError::AlreadyPaid)
                }
                Some(_) => Err(LedgerError::NotFound("installment")),
            };
        }

        if self.record_payment_transaction {
            let (amount_cents, month_year, client_id) = unit
                .installment_payment_context(installment_id)
                .await?
                .ok_or(LedgerError::NotFound("installment"))?;

            let transaction = Transaction {
                id: Transaction::generate_id(Utc::now().timestamp_millis()),
                client_id: client_id.clone(),
                user_id: user_id.to_string(),
                amount: money::from_cents(amount_cents),
                kind: TransactionKind::Received,
                description: format!("Installment {} paid", month_year),
                date: Utc::now(),
            };

            unit.insert_transaction(&transaction).await?;

            if !unit.adjust_client_balance(user_id, &client_id, amount_cents).await? {
                unit.rollback().await?;
                return Err(LedgerError::NotFound("client"));
            }
            if !unit.adjust_user_balance(user_id, amount_cents).await? {
                unit.rollback().await?;
                return Err(LedgerError::NotFound("user"));
            }
        }

        unit.commit().await?;

        info!("Marked installment {} paid", installment_id);
        Ok(())
    }

    /// List a client's plans in creation order.
    pub async fn list_plans(&self, user_id: &str, client_id: &str) -> Result<Vec<InstallmentPlan>> {
        self.authorize_client(user_id, client_id).await?;
        self.installments.list_plans(client_id).await
    }

    /// List a plan's installments by due month ascending.
    pub async fn list_installments(&self, user_id: &str, plan_id: &str) -> Result<Vec<Installment>> {
        let plan = self
            .installments
            .get_plan(plan_id)
            .await?
            .ok_or(LedgerError::NotFound("plan"))?;
        self.authorize_client(user_id, &plan.client_id).await?;
        self.installments.list_installments(plan_id).await
    }

    /// List a client's pending installments across plans, earliest first.
    pub async fn list_pending(&self, user_id: &str, client_id: &str) -> Result<Vec<Installment>> {
        self.authorize_client(user_id, client_id).await?;
        self.installments.list_pending(client_id).await
    }

    async fn authorize_client(&self, user_id: &str, client_id: &str) -> Result<()> {
        match self.clients.get_client(client_id).await? {
            None => Err(LedgerError::NotFound("client")),
            Some(client) if client.user_id != user_id => Err(LedgerError::Unauthorized("client")),
            Some(_) => Ok(()),
        }
    }
}

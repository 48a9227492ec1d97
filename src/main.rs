use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{info, Level};

use client_ledger_backend::domain::models::TransactionKind;
use client_ledger_backend::domain::{
    BalanceService, ClientService, InstallmentService, TransactionService, UserService,
};
use client_ledger_backend::storage::LedgerDb;

/// Smoke entry point: opens the store and walks one end-to-end ledger flow.
/// The HTTP layer lives elsewhere; this binary only exercises the core.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Setting up database");
    let db = match std::env::var("LEDGER_DATABASE_URL") {
        Ok(url) => LedgerDb::new(&url).await?,
        Err(_) => LedgerDb::init().await?,
    };

    let users = UserService::new(db.clone());
    let clients = ClientService::new(db.clone());
    let transactions = TransactionService::new(db.clone());
    let installments = InstallmentService::new(db.clone());
    let balances = BalanceService::new(db.clone());

    let user = users.create_user("Demo User", "555-0100").await?;
    let client = clients.create_client(&user.id, "Demo Client", "555-0199").await?;

    transactions
        .apply_transaction(
            &user.id,
            &client.id,
            Decimal::from_str("250.00")?,
            TransactionKind::Received,
            "Opening payment",
            Utc::now(),
        )
        .await?;
    transactions
        .apply_transaction(
            &user.id,
            &client.id,
            Decimal::from_str("30.00")?,
            TransactionKind::Given,
            "Goods on credit",
            Utc::now(),
        )
        .await?;

    let start = NaiveDate::from_ymd_opt(2026, 9, 1)
        .ok_or_else(|| anyhow::anyhow!("invalid start date"))?;
    let plan_id = installments
        .create_plan(&user.id, &client.id, Decimal::from_str("1000.00")?, 3, start)
        .await?;

    let pending = installments.list_pending(&user.id, &client.id).await?;
    if let Some(first_pending) = pending.first() {
        installments.mark_installment_paid(&user.id, &first_pending.id).await?;
    }

    let client_balance = balances.compute_client_balance(&user.id, &client.id).await?;
    let summary = balances.user_summary(&user.id).await?;
    let schedule = installments.list_installments(&user.id, &plan_id).await?;

    info!("Client balance: {}", client_balance);
    info!(
        "User totals: balance {} (received {}, given {})",
        summary.total_balance, summary.total_received, summary.total_given
    );
    for installment in &schedule {
        info!(
            "Installment {}: {} [{}]",
            installment.month_year,
            installment.amount,
            installment.status.as_str()
        );
    }

    let errors = balances.validate_balances(&user.id).await?;
    if errors.is_empty() {
        info!("Balance caches consistent with the transaction set");
    } else {
        for error in &errors {
            tracing::warn!("{}", error);
        }
    }

    Ok(())
}

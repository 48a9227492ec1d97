//! Domain models for installment plans and their scheduled dues.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment state of a single installment. Transitions Pending → Paid only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    Pending,
    Paid,
}

impl InstallmentStatus {
    /// Column value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "Pending",
            InstallmentStatus::Paid => "Paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(InstallmentStatus::Pending),
            "Paid" => Some(InstallmentStatus::Paid),
            _ => None,
        }
    }
}

/// A receivable split across months. Immutable once its installments exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub id: String,
    pub client_id: String,
    /// Equals the sum of the generated installments exactly.
    pub total_amount: Decimal,
    pub months: u32,
    /// First due month.
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl InstallmentPlan {
    /// Format: `plan-<timestamp_ms>-<suffix>`.
    pub fn generate_id(timestamp_ms: i64) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("plan-{}-{}", timestamp_ms, &suffix[..8])
    }
}

/// One scheduled due of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: String,
    pub plan_id: String,
    /// `YYYY-MM` label of the due month; unique within a plan.
    pub month_year: String,
    pub amount: Decimal,
    pub status: InstallmentStatus,
}

impl Installment {
    /// Format: `inst-<timestamp_ms>-<suffix>`.
    pub fn generate_id(timestamp_ms: i64) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("inst-{}-{}", timestamp_ms, &suffix[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [InstallmentStatus::Pending, InstallmentStatus::Paid] {
            assert_eq!(InstallmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InstallmentStatus::parse("paid"), None);
    }
}

//! Domain model for a ledger transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a transaction relative to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received from the client; raises the client balance.
    Received,
    /// Money given to the client; lowers the client balance.
    Given,
}

impl TransactionKind {
    /// Column value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Received => "received",
            TransactionKind::Given => "given",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "received" => Some(TransactionKind::Received),
            "given" => Some(TransactionKind::Given),
            _ => None,
        }
    }

    /// Apply this kind's sign to a stored magnitude.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionKind::Received => amount,
            TransactionKind::Given => -amount,
        }
    }
}

/// An immutable ledger entry. Edits are modeled as reverse + re-apply, never
/// in-place mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub client_id: String,
    pub user_id: String,
    /// Stored magnitude, always positive; `kind` carries the sign.
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub description: String,
    pub date: DateTime<Utc>,
}

impl Transaction {
    /// Generate a unique transaction id.
    /// Format: `txn-<timestamp_ms>-<suffix>`, e.g. `txn-1704067200123-af3c91d2`.
    pub fn generate_id(timestamp_ms: i64) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("txn-{}-{}", timestamp_ms, &suffix[..8])
    }

    /// Signed effect of this transaction on its client's balance.
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}

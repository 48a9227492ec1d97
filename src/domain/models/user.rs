//! Domain model for a user.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity owning a set of clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: String,
    /// Denormalized aggregate of the owned clients' balances. Maintained
    /// inside the same unit of work as every mutation that moves it.
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Format: `user-<timestamp_ms>-<suffix>`.
    pub fn generate_id(timestamp_ms: i64) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("user-{}-{}", timestamp_ms, &suffix[..8])
    }
}

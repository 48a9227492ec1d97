//! Domain model for a client.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A counterparty with whom money is exchanged. Exclusively owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    /// Denormalized cache of the signed transaction sum for this client.
    /// Positive means the client owes the user.
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Format: `client-<timestamp_ms>-<suffix>`.
    pub fn generate_id(timestamp_ms: i64) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("client-{}-{}", timestamp_ms, &suffix[..8])
    }
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Transfer links die after this long, accepted or not.
pub const TRANSFER_TTL_HOURS: i64 = 24;

/// Short-lived, single-use handoff of a ticket to a new holder.
/// Logically destroyed on acceptance (consumed flag) or expiry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransferRequest {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub recipient_contact: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRequest {
    pub fn expiry_from(created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::hours(TRANSFER_TTL_HOURS)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

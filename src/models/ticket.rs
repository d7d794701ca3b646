use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A ticket may change hands at most this many times.
pub const TRANSFER_LIMIT: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Confirmed,
    CheckedIn,
    Cancelled,
}

/// One purchased unit. Core identity fields (event, tier, scan token,
/// price paid) are immutable after issuance; only `status`,
/// `checked_in_at`, `holder_id` and `transfer_count` ever change.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub tier_id: Uuid,
    pub holder_id: Uuid,
    /// Unguessable token carried by the QR code shown at the door.
    pub scan_token: String,
    pub price_paid: Decimal,
    pub currency: String,
    pub status: TicketStatus,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub transfer_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One confirmed order, recorded after issuance for reconciliation and
/// buyer history. Payment itself happens upstream; we only keep the
/// reference the provider reported back.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub event_id: Uuid,
    pub buyer_id: Uuid,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub promo_code_id: Option<Uuid>,
    pub payment_method: String,
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Automatic percentage discount unlocked by order size. Several may exist
/// per event; only the highest qualifying percentage ever applies.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupDiscount {
    pub id: Uuid,
    pub event_id: Uuid,
    pub min_quantity: i32,
    /// Whole percentage points, 0-100.
    pub percent: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "discount_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

/// Buyer-entered code. `code` is unique per event, matched case-insensitively.
///
/// Invariant: `redemption_count <= max_uses` whenever `max_uses` is set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromoCode {
    pub id: Uuid,
    pub event_id: Uuid,
    pub code: String,
    pub kind: DiscountKind,
    /// Percentage points for `Percentage`, a major-unit amount for `Fixed`.
    pub value: Decimal,
    pub max_uses: Option<i32>,
    pub redemption_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at < now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses
            .map_or(false, |cap| self.redemption_count >= cap)
    }
}

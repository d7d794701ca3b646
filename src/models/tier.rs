use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A named class of ticket with its own price and capacity within one event.
///
/// Invariant: `0 <= sold <= capacity` after every mutation. The only code
/// allowed to change `sold` is the inventory allocator, through the guarded
/// repository writes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tier {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub capacity: i32,
    pub sold: i32,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tier {
    pub fn remaining(&self) -> i32 {
        self.capacity - self.sold
    }

    /// Window check only; does not consider remaining inventory.
    pub fn in_sale_window(&self, now: DateTime<Utc>) -> bool {
        let started = self.sale_start.map_or(true, |start| start <= now);
        let not_ended = self.sale_end.map_or(true, |end| end >= now);
        started && not_ended
    }

    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.in_sale_window(now) && self.remaining() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tier(capacity: i32, sold: i32) -> Tier {
        let now = Utc::now();
        Tier {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "General".to_string(),
            description: None,
            price: Decimal::new(2500, 2),
            capacity,
            sold,
            sale_start: None,
            sale_end: None,
            is_active: true,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sold_out_tier_is_not_on_sale_regardless_of_window() {
        let t = tier(10, 10);
        assert_eq!(t.remaining(), 0);
        assert!(!t.is_on_sale(Utc::now()));
    }

    #[test]
    fn open_window_bounds_are_inclusive() {
        let now = Utc::now();
        let mut t = tier(10, 0);
        t.sale_start = Some(now);
        t.sale_end = Some(now);
        assert!(t.is_on_sale(now));
        assert!(!t.is_on_sale(now + Duration::seconds(1)));
        assert!(!t.is_on_sale(now - Duration::seconds(1)));
    }

    #[test]
    fn inactive_tier_is_never_on_sale() {
        let mut t = tier(10, 0);
        t.is_active = false;
        assert!(!t.is_on_sale(Utc::now()));
    }
}

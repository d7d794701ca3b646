use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Event, Tier};
use crate::repository::{EventRepository, TierRepository};

use super::{bounded, CoreError};

/// What the storefront renders for one tier.
#[derive(Debug, Clone, Serialize)]
pub struct TierAvailability {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub capacity: i32,
    pub remaining: i32,
    pub is_on_sale: bool,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    pub sort_order: i32,
}

impl TierAvailability {
    fn from_tier(tier: &Tier, now: DateTime<Utc>) -> Self {
        Self {
            id: tier.id,
            name: tier.name.clone(),
            description: tier.description.clone(),
            price: tier.price,
            capacity: tier.capacity,
            remaining: tier.remaining(),
            is_on_sale: tier.is_on_sale(now),
            sale_start: tier.sale_start,
            sale_end: tier.sale_end,
            sort_order: tier.sort_order,
        }
    }
}

/// Read-only tier listing; no side effects.
#[derive(Clone)]
pub struct Catalog {
    events: Arc<dyn EventRepository>,
    tiers: Arc<dyn TierRepository>,
    store_timeout: Duration,
}

impl Catalog {
    pub fn new(
        events: Arc<dyn EventRepository>,
        tiers: Arc<dyn TierRepository>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            events,
            tiers,
            store_timeout,
        }
    }

    pub async fn load_event(&self, event_id: Uuid) -> Result<Event, CoreError> {
        bounded(self.store_timeout, self.events.find(event_id))
            .await?
            .ok_or(CoreError::EventNotFound)
    }

    /// Tiers of `event_id` in sort order, annotated with remaining
    /// inventory and whether they can be bought right now. A tier with
    /// nothing remaining reports sold out regardless of its window.
    pub async fn list_available_tiers(
        &self,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<TierAvailability>, CoreError> {
        self.load_event(event_id).await?;

        let tiers = bounded(self.store_timeout, self.tiers.list_by_event(event_id)).await?;
        Ok(tiers
            .iter()
            .map(|tier| TierAvailability::from_tier(tier, now))
            .collect())
    }
}

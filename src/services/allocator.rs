use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::repository::TierRepository;

use super::{bounded, CoreError};

/// The only component allowed to mutate a tier's sold count. Each call is
/// a single guarded read-check-write in the repository; there is no retry
/// here, a lost race surfaces as `InsufficientInventory` and the caller
/// decides whether to re-read and try again.
#[derive(Clone)]
pub struct Allocator {
    tiers: Arc<dyn TierRepository>,
    store_timeout: Duration,
}

impl Allocator {
    pub fn new(tiers: Arc<dyn TierRepository>, store_timeout: Duration) -> Self {
        Self {
            tiers,
            store_timeout,
        }
    }

    /// Secures `quantity` units of `tier_id`, failing without a write when
    /// capacity, the sale window, or the active flag says no at execution
    /// time. Two racing calls for the last unit produce exactly one
    /// success.
    pub async fn reserve(
        &self,
        tier_id: Uuid,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if quantity <= 0 {
            return Err(CoreError::Validation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }

        bounded(self.store_timeout, self.tiers.find(tier_id))
            .await?
            .ok_or(CoreError::TierNotFound)?;

        let reserved =
            bounded(self.store_timeout, self.tiers.try_reserve(tier_id, quantity, now)).await?;
        if reserved {
            info!(%tier_id, quantity, "reserved inventory");
            Ok(())
        } else {
            debug!(%tier_id, quantity, "reservation rejected");
            Err(CoreError::InsufficientInventory { tier_id })
        }
    }

    /// Returns `quantity` units to the pool on refund or cancellation.
    /// Guarded so `sold` never goes negative.
    pub async fn release(&self, tier_id: Uuid, quantity: i32) -> Result<(), CoreError> {
        if quantity <= 0 {
            return Err(CoreError::Validation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }

        let released =
            bounded(self.store_timeout, self.tiers.try_release(tier_id, quantity)).await?;
        if released {
            info!(%tier_id, quantity, "released inventory");
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "cannot release {quantity} units from tier {tier_id}"
            )))
        }
    }
}

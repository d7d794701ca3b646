//! The confirmed-payment purchase flow: quote, reserve, redeem the promo
//! counter, issue, record. Invoked only after the payment provider has
//! reported success; this core never initiates or polls payment state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::{EventStatus, Purchase, Ticket};
use crate::repository::{
    EventRepository, PromoCodeRepository, PurchaseRepository, TierRepository,
};

use super::pricing::{AppliedDiscount, LineItem, Pricing, PromoRejection, Quote};
use super::{bounded, Allocator, CoreError, Issuer};

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    /// "card", "mobile_money", ... as reported by the payment component.
    pub method: String,
    pub reference: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub purchase_id: Uuid,
    pub quote: Quote,
    pub tickets: Vec<Ticket>,
}

#[derive(Clone)]
pub struct PurchaseService {
    events: Arc<dyn EventRepository>,
    tiers: Arc<dyn TierRepository>,
    promos: Arc<dyn PromoCodeRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    pricing: Pricing,
    allocator: Allocator,
    issuer: Issuer,
    store_timeout: Duration,
}

impl PurchaseService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: Arc<dyn EventRepository>,
        tiers: Arc<dyn TierRepository>,
        promos: Arc<dyn PromoCodeRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        pricing: Pricing,
        allocator: Allocator,
        issuer: Issuer,
        store_timeout: Duration,
    ) -> Self {
        Self {
            events,
            tiers,
            promos,
            purchases,
            pricing,
            allocator,
            issuer,
            store_timeout,
        }
    }

    async fn load_event(&self, event_id: Uuid) -> Result<crate::models::Event, CoreError> {
        bounded(self.store_timeout, self.events.find(event_id))
            .await?
            .ok_or(CoreError::EventNotFound)
    }

    pub async fn purchase(
        &self,
        event_id: Uuid,
        buyer_id: Uuid,
        items: &[LineItem],
        promo_code: Option<&str>,
        payment: PaymentConfirmation,
        now: DateTime<Utc>,
    ) -> Result<PurchaseReceipt, CoreError> {
        let event = self.load_event(event_id).await?;
        if event.status == EventStatus::Cancelled {
            return Err(CoreError::Validation("event has been cancelled".into()));
        }

        let mut quote = self.pricing.quote(&event, items, promo_code, now).await?;

        // Reserve every line before issuing anything. A failed line hands
        // back what the earlier lines took, so a rejected order leaves no
        // partial state.
        let mut reserved: Vec<(Uuid, i32)> = Vec::with_capacity(items.len());
        for item in items {
            match self.allocator.reserve(item.tier_id, item.quantity, now).await {
                Ok(()) => reserved.push((item.tier_id, item.quantity)),
                Err(err) => {
                    for (tier_id, quantity) in reserved {
                        if let Err(cause) = self.allocator.release(tier_id, quantity).await {
                            warn!(%tier_id, quantity, %cause, "failed to roll back reservation");
                        }
                    }
                    return Err(err);
                }
            }
        }

        // The promo's redemption counter uses the same guarded-increment
        // discipline as inventory. Losing the race at the cap boundary
        // re-prices the order without the promo instead of blocking it.
        if let AppliedDiscount::Promo { promo_id, .. } = &quote.applied {
            let redeemed =
                bounded(self.store_timeout, self.promos.try_redeem(*promo_id, now)).await?;
            if !redeemed {
                warn!(%promo_id, "promo cap reached during purchase, re-pricing without it");
                quote = self.pricing.quote(&event, items, None, now).await?;
                quote.promo_rejection = Some(PromoRejection::Exhausted);
            }
        }

        let total_quantity: i32 = items.iter().map(|i| i.quantity).sum();
        let mut tickets: Vec<Ticket> = Vec::with_capacity(total_quantity as usize);
        for item in items {
            let tier = bounded(self.store_timeout, self.tiers.find(item.tier_id))
                .await?
                .ok_or(CoreError::TierNotFound)?;
            match self
                .issuer
                .issue(
                    event.id,
                    tier.id,
                    buyer_id,
                    item.quantity,
                    tier.price,
                    &event.currency,
                    now,
                )
                .await
            {
                Ok(batch) => tickets.extend(batch),
                Err(cause) => {
                    // The reservation stands; this mismatch must reach an
                    // operator rather than being quietly absorbed.
                    error!(%event_id, %buyer_id, %cause, "issuance mismatch after reservation");
                    return Err(CoreError::Reconciliation {
                        reserved: total_quantity,
                        issued: tickets.len() as i32,
                    });
                }
            }
        }

        let promo_code_id = match &quote.applied {
            AppliedDiscount::Promo { promo_id, .. } => Some(*promo_id),
            _ => None,
        };
        let record = Purchase {
            id: Uuid::new_v4(),
            event_id,
            buyer_id,
            quantity: total_quantity,
            subtotal: quote.subtotal,
            discount: quote.discount,
            total: quote.total,
            currency: quote.currency.clone(),
            promo_code_id,
            payment_method: payment.method,
            payment_reference: payment.reference,
            created_at: now,
            updated_at: now,
        };
        bounded(self.store_timeout, self.purchases.insert(&record)).await?;

        Ok(PurchaseReceipt {
            purchase_id: record.id,
            quote,
            tickets,
        })
    }
}

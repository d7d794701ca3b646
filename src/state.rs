use std::sync::Arc;
use std::time::Duration;

use crate::repository::{
    EventRepository, GroupDiscountRepository, PromoCodeRepository, PurchaseRepository,
    TicketRepository, TierRepository, TransferRepository,
};
use crate::services::{
    Allocator, Catalog, CheckinService, Issuer, Notifier, Pricing, PurchaseService,
    TransferService,
};

/// Shared handler state: one instance of each service, all pointed at the
/// same store. Built once at startup (or per test) from any type that
/// implements every repository trait.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub pricing: Pricing,
    pub purchase: PurchaseService,
    pub checkin: CheckinService,
    pub transfer: TransferService,
}

impl AppState {
    pub fn from_store<S>(store: Arc<S>, notifier: Arc<dyn Notifier>, store_timeout: Duration) -> Self
    where
        S: EventRepository
            + TierRepository
            + GroupDiscountRepository
            + PromoCodeRepository
            + TicketRepository
            + TransferRepository
            + PurchaseRepository
            + 'static,
    {
        let events: Arc<dyn EventRepository> = store.clone();
        let tiers: Arc<dyn TierRepository> = store.clone();
        let groups: Arc<dyn GroupDiscountRepository> = store.clone();
        let promos: Arc<dyn PromoCodeRepository> = store.clone();
        let tickets: Arc<dyn TicketRepository> = store.clone();
        let transfers: Arc<dyn TransferRepository> = store.clone();
        let purchases: Arc<dyn PurchaseRepository> = store;

        let pricing = Pricing::new(
            tiers.clone(),
            promos.clone(),
            groups,
            store_timeout,
        );
        let allocator = Allocator::new(tiers.clone(), store_timeout);
        let issuer = Issuer::new(tickets.clone(), store_timeout);

        Self {
            catalog: Catalog::new(events.clone(), tiers.clone(), store_timeout),
            pricing: pricing.clone(),
            purchase: PurchaseService::new(
                events.clone(),
                tiers,
                promos,
                purchases,
                pricing,
                allocator,
                issuer,
                store_timeout,
            ),
            checkin: CheckinService::new(events, tickets.clone(), store_timeout),
            transfer: TransferService::new(tickets, transfers, notifier, store_timeout),
        }
    }
}

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Event, GroupDiscount, PromoCode, Purchase, Ticket, TicketStatus, Tier, TransferRequest,
    TRANSFER_LIMIT,
};

use super::{
    EventRepository, GroupDiscountRepository, PromoCodeRepository, PurchaseRepository,
    RepoResult, TicketRepository, TierRepository, TransferRepository,
};

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, Event>,
    tiers: HashMap<Uuid, Tier>,
    group_discounts: HashMap<Uuid, GroupDiscount>,
    promo_codes: HashMap<Uuid, PromoCode>,
    tickets: HashMap<Uuid, Ticket>,
    transfers: HashMap<Uuid, TransferRequest>,
    purchases: Vec<Purchase>,
}

/// In-memory store used by tests and local development. One mutex covers
/// every collection, so each trait method is as atomic as the Postgres
/// implementation's conditional updates.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn put_event(&self, event: Event) {
        self.lock().events.insert(event.id, event);
    }

    pub fn put_tier(&self, tier: Tier) {
        self.lock().tiers.insert(tier.id, tier);
    }

    pub fn put_group_discount(&self, discount: GroupDiscount) {
        self.lock().group_discounts.insert(discount.id, discount);
    }

    pub fn put_promo_code(&self, promo: PromoCode) {
        self.lock().promo_codes.insert(promo.id, promo);
    }

    pub fn put_ticket(&self, ticket: Ticket) {
        self.lock().tickets.insert(ticket.id, ticket);
    }

    pub fn get_tier(&self, id: Uuid) -> Option<Tier> {
        self.lock().tiers.get(&id).cloned()
    }

    pub fn get_ticket(&self, id: Uuid) -> Option<Ticket> {
        self.lock().tickets.get(&id).cloned()
    }

    pub fn get_promo_code(&self, id: Uuid) -> Option<PromoCode> {
        self.lock().promo_codes.get(&id).cloned()
    }

    pub fn purchases(&self) -> Vec<Purchase> {
        self.lock().purchases.clone()
    }

    pub fn ticket_count(&self) -> usize {
        self.lock().tickets.len()
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Event>> {
        Ok(self.lock().events.get(&id).cloned())
    }
}

#[async_trait]
impl TierRepository for InMemoryStore {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Tier>> {
        Ok(self.lock().tiers.get(&id).cloned())
    }

    async fn list_by_event(&self, event_id: Uuid) -> RepoResult<Vec<Tier>> {
        let mut tiers: Vec<Tier> = self
            .lock()
            .tiers
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect();
        tiers.sort_by_key(|t| (t.sort_order, t.created_at));
        Ok(tiers)
    }

    async fn try_reserve(
        &self,
        tier_id: Uuid,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut inner = self.lock();
        let Some(tier) = inner.tiers.get_mut(&tier_id) else {
            return Ok(false);
        };
        if !tier.is_active || !tier.in_sale_window(now) || tier.sold + quantity > tier.capacity {
            return Ok(false);
        }
        tier.sold += quantity;
        tier.updated_at = now;
        Ok(true)
    }

    async fn try_release(&self, tier_id: Uuid, quantity: i32) -> RepoResult<bool> {
        let mut inner = self.lock();
        let Some(tier) = inner.tiers.get_mut(&tier_id) else {
            return Ok(false);
        };
        if tier.sold - quantity < 0 {
            return Ok(false);
        }
        tier.sold -= quantity;
        tier.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl GroupDiscountRepository for InMemoryStore {
    async fn list_active_by_event(&self, event_id: Uuid) -> RepoResult<Vec<GroupDiscount>> {
        Ok(self
            .lock()
            .group_discounts
            .values()
            .filter(|d| d.event_id == event_id && d.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PromoCodeRepository for InMemoryStore {
    async fn find_by_code(&self, event_id: Uuid, code: &str) -> RepoResult<Option<PromoCode>> {
        Ok(self
            .lock()
            .promo_codes
            .values()
            .find(|p| p.event_id == event_id && p.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn try_redeem(&self, promo_id: Uuid, now: DateTime<Utc>) -> RepoResult<bool> {
        let mut inner = self.lock();
        let Some(promo) = inner.promo_codes.get_mut(&promo_id) else {
            return Ok(false);
        };
        if !promo.is_active || promo.is_expired(now) || promo.is_exhausted() {
            return Ok(false);
        }
        promo.redemption_count += 1;
        promo.updated_at = now;
        Ok(true)
    }
}

#[async_trait]
impl TicketRepository for InMemoryStore {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Ticket>> {
        Ok(self.lock().tickets.get(&id).cloned())
    }

    async fn find_by_scan_token(&self, token: &str) -> RepoResult<Option<Ticket>> {
        Ok(self
            .lock()
            .tickets
            .values()
            .find(|t| t.scan_token == token)
            .cloned())
    }

    async fn insert_batch(&self, tickets: &[Ticket]) -> RepoResult<()> {
        let mut inner = self.lock();
        for ticket in tickets {
            inner.tickets.insert(ticket.id, ticket.clone());
        }
        Ok(())
    }

    async fn try_check_in(&self, ticket_id: Uuid, at: DateTime<Utc>) -> RepoResult<bool> {
        let mut inner = self.lock();
        let Some(ticket) = inner.tickets.get_mut(&ticket_id) else {
            return Ok(false);
        };
        if ticket.status != TicketStatus::Confirmed {
            return Ok(false);
        }
        ticket.status = TicketStatus::CheckedIn;
        ticket.checked_in_at = Some(at);
        ticket.updated_at = at;
        Ok(true)
    }
}

#[async_trait]
impl TransferRepository for InMemoryStore {
    async fn insert(&self, request: &TransferRequest) -> RepoResult<()> {
        self.lock().transfers.insert(request.id, request.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> RepoResult<Option<TransferRequest>> {
        Ok(self
            .lock()
            .transfers
            .values()
            .find(|r| r.token == token)
            .cloned())
    }

    async fn try_consume(
        &self,
        request_id: Uuid,
        new_holder: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut inner = self.lock();

        let Some(request) = inner.transfers.get(&request_id) else {
            return Ok(false);
        };
        if request.consumed || request.is_expired(now) {
            return Ok(false);
        }
        let ticket_id = request.ticket_id;

        let transferable = inner.tickets.get(&ticket_id).is_some_and(|t| {
            t.status == TicketStatus::Confirmed && t.transfer_count < TRANSFER_LIMIT
        });
        if !transferable {
            return Ok(false);
        }

        // Both mutations happen under the same lock acquisition.
        if let Some(request) = inner.transfers.get_mut(&request_id) {
            request.consumed = true;
            request.consumed_by = Some(new_holder);
            request.updated_at = now;
        }
        if let Some(ticket) = inner.tickets.get_mut(&ticket_id) {
            ticket.holder_id = new_holder;
            ticket.transfer_count += 1;
            ticket.updated_at = now;
        }
        Ok(true)
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryStore {
    async fn insert(&self, purchase: &Purchase) -> RepoResult<()> {
        self.lock().purchases.push(purchase.clone());
        Ok(())
    }
}

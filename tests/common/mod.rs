#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as TimeDelta, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use entrada_server::models::{
    DiscountKind, Event, EventStatus, GroupDiscount, PromoCode, Ticket, TicketStatus, Tier,
};
use entrada_server::repository::InMemoryStore;
use entrada_server::services::TracingNotifier;
use entrada_server::state::AppState;

pub const STORE_TIMEOUT: Duration = Duration::from_secs(2);

pub fn app_state(store: &Arc<InMemoryStore>) -> AppState {
    AppState::from_store(store.clone(), Arc::new(TracingNotifier), STORE_TIMEOUT)
}

/// Active event that started an hour ago and runs four more hours.
pub fn seed_event(store: &InMemoryStore) -> Event {
    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4(),
        organizer_id: Uuid::new_v4(),
        title: "Harbour Lights Festival".to_string(),
        description: None,
        location: "Pier 7".to_string(),
        currency: "USD".to_string(),
        start_time: now - TimeDelta::hours(1),
        end_time: Some(now + TimeDelta::hours(4)),
        status: EventStatus::Active,
        created_at: now,
        updated_at: now,
    };
    store.put_event(event.clone());
    event
}

/// Event that ended a day ago; every scan against it must classify expired.
pub fn seed_past_event(store: &InMemoryStore) -> Event {
    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4(),
        organizer_id: Uuid::new_v4(),
        title: "Last Year's Gala".to_string(),
        description: None,
        location: "Grand Hall".to_string(),
        currency: "USD".to_string(),
        start_time: now - TimeDelta::hours(48),
        end_time: Some(now - TimeDelta::hours(24)),
        status: EventStatus::Active,
        created_at: now,
        updated_at: now,
    };
    store.put_event(event.clone());
    event
}

pub fn seed_tier(store: &InMemoryStore, event: &Event, price: Decimal, capacity: i32) -> Tier {
    let now = Utc::now();
    let tier = Tier {
        id: Uuid::new_v4(),
        event_id: event.id,
        name: "General Admission".to_string(),
        description: None,
        price,
        capacity,
        sold: 0,
        sale_start: None,
        sale_end: None,
        is_active: true,
        sort_order: 0,
        created_at: now,
        updated_at: now,
    };
    store.put_tier(tier.clone());
    tier
}

pub fn seed_group_discount(
    store: &InMemoryStore,
    event: &Event,
    min_quantity: i32,
    percent: i32,
) -> GroupDiscount {
    let now = Utc::now();
    let discount = GroupDiscount {
        id: Uuid::new_v4(),
        event_id: event.id,
        min_quantity,
        percent,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    store.put_group_discount(discount.clone());
    discount
}

pub fn seed_promo(
    store: &InMemoryStore,
    event: &Event,
    code: &str,
    kind: DiscountKind,
    value: Decimal,
    max_uses: Option<i32>,
) -> PromoCode {
    let now = Utc::now();
    let promo = PromoCode {
        id: Uuid::new_v4(),
        event_id: event.id,
        code: code.to_string(),
        kind,
        value,
        max_uses,
        redemption_count: 0,
        expires_at: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    store.put_promo_code(promo.clone());
    promo
}

pub fn seed_ticket(
    store: &InMemoryStore,
    event: &Event,
    tier: &Tier,
    status: TicketStatus,
) -> Ticket {
    let now = Utc::now();
    let ticket = Ticket {
        id: Uuid::new_v4(),
        event_id: event.id,
        tier_id: tier.id,
        holder_id: Uuid::new_v4(),
        scan_token: Uuid::new_v4().simple().to_string(),
        price_paid: tier.price,
        currency: event.currency.clone(),
        status,
        checked_in_at: (status == TicketStatus::CheckedIn).then(Utc::now),
        transfer_count: 0,
        created_at: now,
        updated_at: now,
    };
    store.put_ticket(ticket.clone());
    ticket
}

//! Oversell protection under concurrent reservations.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as TimeDelta, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use entrada_server::models::{DiscountKind, Tier};
use entrada_server::repository::{InMemoryStore, PromoCodeRepository, RepoResult, TierRepository};
use entrada_server::services::{Allocator, CoreError};

use common::{app_state, seed_event, seed_promo, seed_tier, STORE_TIMEOUT};

fn allocator(store: &Arc<InMemoryStore>) -> Allocator {
    let tiers: Arc<dyn TierRepository> = store.clone();
    Allocator::new(tiers, STORE_TIMEOUT)
}

#[tokio::test]
async fn concurrent_reservations_fill_exactly_capacity() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 5);

    let alloc = allocator(&store);
    let now = Utc::now();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let alloc = alloc.clone();
        handles.push(tokio::spawn(
            async move { alloc.reserve(tier.id, 1, now).await },
        ));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(CoreError::InsufficientInventory { .. }) => rejections += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 5);
    assert_eq!(rejections, 15);

    let tier = store.get_tier(tier.id).unwrap();
    assert_eq!(tier.sold, 5);
    assert!(tier.sold <= tier.capacity);
}

#[tokio::test]
async fn two_buyers_race_for_the_last_unit() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(2500, 2), 1);
    let state = app_state(&store);

    let items = vec![entrada_server::services::LineItem {
        tier_id: tier.id,
        quantity: 1,
    }];
    fn payment() -> entrada_server::services::PaymentConfirmation {
        entrada_server::services::PaymentConfirmation {
            method: "card".to_string(),
            reference: "txn-race".to_string(),
        }
    }

    let a = {
        let state = state.clone();
        let items = items.clone();
        tokio::spawn(async move {
            state
                .purchase
                .purchase(
                    event.id,
                    uuid::Uuid::new_v4(),
                    &items,
                    None,
                    payment(),
                    Utc::now(),
                )
                .await
        })
    };
    let b = {
        let state = state.clone();
        let items = items.clone();
        tokio::spawn(async move {
            state
                .purchase
                .purchase(
                    event.id,
                    uuid::Uuid::new_v4(),
                    &items,
                    None,
                    payment(),
                    Utc::now(),
                )
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let losses = results
        .iter()
        .filter(|r| matches!(r, Err(CoreError::InsufficientInventory { .. })))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(losses, 1);
    assert_eq!(store.ticket_count(), 1);
    assert_eq!(store.get_tier(tier.id).unwrap().sold, 1);
}

#[tokio::test]
async fn reservation_respects_sale_window_at_execution_time() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let mut tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);
    tier.sale_end = Some(Utc::now() - TimeDelta::hours(1));
    store.put_tier(tier.clone());

    let alloc = allocator(&store);
    let result = alloc.reserve(tier.id, 1, Utc::now()).await;
    assert!(matches!(
        result,
        Err(CoreError::InsufficientInventory { .. })
    ));
    assert_eq!(store.get_tier(tier.id).unwrap().sold, 0);
}

#[tokio::test]
async fn release_never_drives_sold_negative() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);

    let alloc = allocator(&store);
    alloc.reserve(tier.id, 3, Utc::now()).await.unwrap();
    alloc.release(tier.id, 2).await.unwrap();
    assert_eq!(store.get_tier(tier.id).unwrap().sold, 1);

    let too_many = alloc.release(tier.id, 5).await;
    assert!(matches!(too_many, Err(CoreError::Validation(_))));
    assert_eq!(store.get_tier(tier.id).unwrap().sold, 1);
}

/// Answers every call, but only after a fixed delay.
struct SluggishTiers {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

#[async_trait]
impl TierRepository for SluggishTiers {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Tier>> {
        tokio::time::sleep(self.delay).await;
        TierRepository::find(&*self.inner, id).await
    }

    async fn list_by_event(&self, event_id: Uuid) -> RepoResult<Vec<Tier>> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_by_event(event_id).await
    }

    async fn try_reserve(
        &self,
        tier_id: Uuid,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.try_reserve(tier_id, quantity, now).await
    }

    async fn try_release(&self, tier_id: Uuid, quantity: i32) -> RepoResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.try_release(tier_id, quantity).await
    }
}

#[tokio::test]
async fn slow_store_surfaces_a_timeout_not_a_success() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);

    let tiers: Arc<dyn TierRepository> = Arc::new(SluggishTiers {
        inner: store.clone(),
        delay: Duration::from_millis(200),
    });
    let alloc = Allocator::new(tiers, Duration::from_millis(50));

    let result = alloc.reserve(tier.id, 1, Utc::now()).await;
    assert!(matches!(result, Err(CoreError::StoreTimeout)));
    // The timed-out call is reported as a failure; nothing was reserved.
    assert_eq!(store.get_tier(tier.id).unwrap().sold, 0);
}

#[tokio::test]
async fn concurrent_redemptions_never_overshoot_the_cap() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let promo = seed_promo(
        &store,
        &event,
        "CAPPED",
        DiscountKind::Percentage,
        Decimal::from(10),
        Some(3),
    );

    let now = Utc::now();
    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            PromoCodeRepository::try_redeem(&*store, promo.id, now).await
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            granted += 1;
        }
    }

    assert_eq!(granted, 3);
    assert_eq!(store.get_promo_code(promo.id).unwrap().redemption_count, 3);
}

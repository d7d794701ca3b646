//! Transfer lifecycle: creation limits, expiry, and single-use acceptance.

mod common;

use std::sync::Arc;

use chrono::{Duration as TimeDelta, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use entrada_server::models::{TicketStatus, TransferRequest};
use entrada_server::repository::{InMemoryStore, TransferRepository};
use entrada_server::services::CoreError;

use common::{app_state, seed_event, seed_tier, seed_ticket};

#[tokio::test]
async fn transfer_creation_and_acceptance_reassign_the_holder() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);
    let ticket = seed_ticket(&store, &event, &tier, TicketStatus::Confirmed);
    let state = app_state(&store);

    let now = Utc::now();
    let request = state
        .transfer
        .create_transfer(ticket.id, "friend@example.com", now)
        .await
        .unwrap();
    assert_eq!(request.expires_at, now + TimeDelta::hours(24));
    assert!(!request.consumed);

    let recipient = Uuid::new_v4();
    let updated = state
        .transfer
        .accept_transfer(&request.token, recipient, Utc::now())
        .await
        .unwrap();

    assert_eq!(updated.holder_id, recipient);
    assert_eq!(updated.transfer_count, 1);
    // Holder change does not reset status.
    assert_eq!(updated.status, TicketStatus::Confirmed);
}

#[tokio::test]
async fn fourth_transfer_is_rejected_at_the_limit() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);
    let mut ticket = seed_ticket(&store, &event, &tier, TicketStatus::Confirmed);
    ticket.transfer_count = 3;
    store.put_ticket(ticket.clone());
    let state = app_state(&store);

    let result = state
        .transfer
        .create_transfer(ticket.id, "friend@example.com", Utc::now())
        .await;
    assert!(matches!(result, Err(CoreError::TransferLimitExceeded)));
}

#[tokio::test]
async fn non_confirmed_tickets_are_not_transferable() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);
    let state = app_state(&store);

    for status in [TicketStatus::CheckedIn, TicketStatus::Cancelled] {
        let ticket = seed_ticket(&store, &event, &tier, status);
        let result = state
            .transfer
            .create_transfer(ticket.id, "friend@example.com", Utc::now())
            .await;
        assert!(matches!(result, Err(CoreError::TicketNotTransferable)));
    }
}

#[tokio::test]
async fn expired_links_are_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);
    let ticket = seed_ticket(&store, &event, &tier, TicketStatus::Confirmed);
    let state = app_state(&store);

    let now = Utc::now();
    let stale = TransferRequest {
        id: Uuid::new_v4(),
        ticket_id: ticket.id,
        recipient_contact: "friend@example.com".to_string(),
        token: Uuid::new_v4().simple().to_string(),
        expires_at: now - TimeDelta::hours(1),
        consumed: false,
        consumed_by: None,
        created_at: now - TimeDelta::hours(25),
        updated_at: now - TimeDelta::hours(25),
    };
    TransferRepository::insert(&*store, &stale).await.unwrap();

    let result = state
        .transfer
        .accept_transfer(&stale.token, Uuid::new_v4(), now)
        .await;
    assert!(matches!(result, Err(CoreError::TransferExpired)));
    // No reassignment happened.
    assert_eq!(store.get_ticket(ticket.id).unwrap().transfer_count, 0);
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let store = Arc::new(InMemoryStore::new());
    let state = app_state(&store);

    let result = state
        .transfer
        .accept_transfer("no-such-token", Uuid::new_v4(), Utc::now())
        .await;
    assert!(matches!(result, Err(CoreError::TransferNotFound)));
}

#[tokio::test]
async fn second_acceptance_sees_already_consumed() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);
    let ticket = seed_ticket(&store, &event, &tier, TicketStatus::Confirmed);
    let state = app_state(&store);

    let request = state
        .transfer
        .create_transfer(ticket.id, "friend@example.com", Utc::now())
        .await
        .unwrap();

    state
        .transfer
        .accept_transfer(&request.token, Uuid::new_v4(), Utc::now())
        .await
        .unwrap();

    let again = state
        .transfer
        .accept_transfer(&request.token, Uuid::new_v4(), Utc::now())
        .await;
    assert!(matches!(again, Err(CoreError::TransferAlreadyConsumed)));
}

#[tokio::test]
async fn concurrent_acceptances_reassign_exactly_once() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);
    let ticket = seed_ticket(&store, &event, &tier, TicketStatus::Confirmed);
    let state = app_state(&store);

    let request = state
        .transfer
        .create_transfer(ticket.id, "friend@example.com", Utc::now())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let state = state.clone();
        let token = request.token.clone();
        handles.push(tokio::spawn(async move {
            let holder = Uuid::new_v4();
            (
                holder,
                state.transfer.accept_transfer(&token, holder, Utc::now()).await,
            )
        }));
    }

    let mut winners = Vec::new();
    let mut consumed_errors = 0;
    for handle in handles {
        let (holder, result) = handle.await.unwrap();
        match result {
            Ok(_) => winners.push(holder),
            Err(CoreError::TransferAlreadyConsumed) => consumed_errors += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(consumed_errors, 1);

    let stored = store.get_ticket(ticket.id).unwrap();
    assert_eq!(stored.holder_id, winners[0]);
    assert_eq!(stored.transfer_count, 1);
}

#[tokio::test]
async fn transfers_stop_once_the_count_reaches_the_limit() {
    let store = Arc::new(InMemoryStore::new());
    let event = seed_event(&store);
    let tier = seed_tier(&store, &event, Decimal::new(1000, 2), 10);
    let ticket = seed_ticket(&store, &event, &tier, TicketStatus::Confirmed);
    let state = app_state(&store);

    for hop in 0..3 {
        let request = state
            .transfer
            .create_transfer(ticket.id, &format!("hop{hop}@example.com"), Utc::now())
            .await
            .unwrap();
        state
            .transfer
            .accept_transfer(&request.token, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
    }

    assert_eq!(store.get_ticket(ticket.id).unwrap().transfer_count, 3);
    let fourth = state
        .transfer
        .create_transfer(ticket.id, "hop3@example.com", Utc::now())
        .await;
    assert!(matches!(fourth, Err(CoreError::TransferLimitExceeded)));
}

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{Ticket, TicketStatus};
use crate::repository::TicketRepository;

use super::{bounded, CoreError};

/// Scan tokens are random v4 UUIDs: unguessable from ticket sequence and
/// with negligible collision probability, so the door cannot be enumerated.
fn new_scan_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Creates ticket records after a successful reservation. Must only be
/// called with a quantity that was first secured by the allocator.
#[derive(Clone)]
pub struct Issuer {
    tickets: Arc<dyn TicketRepository>,
    store_timeout: Duration,
}

impl Issuer {
    pub fn new(tickets: Arc<dyn TicketRepository>, store_timeout: Duration) -> Self {
        Self {
            tickets,
            store_timeout,
        }
    }

    /// Issues `quantity` tickets in one all-or-nothing batch. If the batch
    /// fails, the reservation is already in place, so the mismatch is
    /// surfaced as a reconciliation error for an operator instead of being
    /// swallowed.
    pub async fn issue(
        &self,
        event_id: Uuid,
        tier_id: Uuid,
        buyer_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, CoreError> {
        let tickets: Vec<Ticket> = (0..quantity)
            .map(|_| Ticket {
                id: Uuid::new_v4(),
                event_id,
                tier_id,
                holder_id: buyer_id,
                scan_token: new_scan_token(),
                price_paid: unit_price,
                currency: currency.to_string(),
                status: TicketStatus::Confirmed,
                checked_in_at: None,
                transfer_count: 0,
                created_at: now,
                updated_at: now,
            })
            .collect();

        match bounded(self.store_timeout, self.tickets.insert_batch(&tickets)).await {
            Ok(()) => {
                info!(%tier_id, %buyer_id, quantity, "issued tickets");
                Ok(tickets)
            }
            Err(cause) => {
                error!(%tier_id, %buyer_id, quantity, %cause, "issuance failed after reservation");
                Err(CoreError::Reconciliation {
                    reserved: quantity,
                    issued: 0,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_tokens_are_unique_and_opaque() {
        let a = new_scan_token();
        let b = new_scan_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Ticket, TicketStatus, TransferRequest, TRANSFER_LIMIT};
use crate::repository::{TicketRepository, TransferRepository};

use super::notify::TEMPLATE_TRANSFER_INVITE;
use super::{bounded, CoreError, Notifier};

fn new_transfer_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Pre-entry handoff of a confirmed ticket via a short-lived, single-use
/// token.
#[derive(Clone)]
pub struct TransferService {
    tickets: Arc<dyn TicketRepository>,
    transfers: Arc<dyn TransferRepository>,
    notifier: Arc<dyn Notifier>,
    store_timeout: Duration,
}

impl TransferService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        transfers: Arc<dyn TransferRepository>,
        notifier: Arc<dyn Notifier>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            tickets,
            transfers,
            notifier,
            store_timeout,
        }
    }

    /// Creates a transfer link for `ticket_id` and reports it to the
    /// messaging collaborator. The link dies 24 hours from now, used or
    /// not.
    pub async fn create_transfer(
        &self,
        ticket_id: Uuid,
        recipient_contact: &str,
        now: DateTime<Utc>,
    ) -> Result<TransferRequest, CoreError> {
        if recipient_contact.trim().is_empty() {
            return Err(CoreError::Validation("recipient contact is required".into()));
        }

        let ticket = bounded(self.store_timeout, self.tickets.find(ticket_id))
            .await?
            .ok_or(CoreError::TicketNotFound)?;

        if ticket.transfer_count >= TRANSFER_LIMIT {
            return Err(CoreError::TransferLimitExceeded);
        }
        if ticket.status != TicketStatus::Confirmed {
            return Err(CoreError::TicketNotTransferable);
        }

        let request = TransferRequest {
            id: Uuid::new_v4(),
            ticket_id,
            recipient_contact: recipient_contact.to_string(),
            token: new_transfer_token(),
            expires_at: TransferRequest::expiry_from(now),
            consumed: false,
            consumed_by: None,
            created_at: now,
            updated_at: now,
        };
        bounded(self.store_timeout, self.transfers.insert(&request)).await?;

        info!(%ticket_id, transfer_id = %request.id, "transfer created");
        self.notifier
            .dispatch(
                recipient_contact,
                TEMPLATE_TRANSFER_INVITE,
                &request.token,
            )
            .await;

        Ok(request)
    }

    /// Accepts a transfer link. Consumption, holder reassignment, and the
    /// transfer-count bump happen as one atomic repository operation; a
    /// token raced by two acceptors reassigns the ticket exactly once.
    pub async fn accept_transfer(
        &self,
        token: &str,
        accepting_holder: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Ticket, CoreError> {
        let request = bounded(self.store_timeout, self.transfers.find_by_token(token))
            .await?
            .ok_or(CoreError::TransferNotFound)?;

        if request.is_expired(now) {
            return Err(CoreError::TransferExpired);
        }
        if request.consumed {
            return Err(CoreError::TransferAlreadyConsumed);
        }

        let consumed = bounded(
            self.store_timeout,
            self.transfers.try_consume(request.id, accepting_holder, now),
        )
        .await?;
        if !consumed {
            // Raced or the ticket itself stopped being transferable between
            // our read and the guarded write.
            debug!(transfer_id = %request.id, "transfer consume guard rejected");
            let request = bounded(self.store_timeout, self.transfers.find_by_token(token))
                .await?
                .ok_or(CoreError::TransferNotFound)?;
            if request.consumed {
                return Err(CoreError::TransferAlreadyConsumed);
            }
            if request.is_expired(now) {
                return Err(CoreError::TransferExpired);
            }
            return Err(CoreError::TicketNotTransferable);
        }

        info!(transfer_id = %request.id, ticket_id = %request.ticket_id, "transfer accepted");
        bounded(self.store_timeout, self.tickets.find(request.ticket_id))
            .await?
            .ok_or(CoreError::TicketNotFound)
    }
}

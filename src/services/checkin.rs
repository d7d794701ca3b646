//! Door-side entry validation.
//!
//! Scanning classifies a token into exactly one outcome; classifications
//! are ordinary return values, never errors, because "already used" is an
//! expected, frequent answer at the door. Confirmation performs the single
//! guarded `confirmed -> checked_in` transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Event, Ticket, TicketStatus};
use crate::repository::{EventRepository, RepositoryError, TicketRepository};

use super::{bounded, CoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Awaiting operator confirmation; nothing has been written yet.
    Valid {
        ticket_id: Uuid,
        tier_id: Uuid,
        holder_id: Uuid,
    },
    NotFound,
    WrongEvent,
    Expired,
    Cancelled,
    AlreadyCheckedIn {
        checked_in_at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    CheckedIn { checked_in_at: DateTime<Utc> },
    /// The guarded transition did not run (or lost a race); the caller
    /// shows the classification instead.
    Rejected { classification: ScanOutcome },
}

/// Fixed classification order, short-circuiting on first match:
/// existence -> event match -> expiry -> cancellation -> already-checked-in.
fn classify_ticket(
    ticket: &Ticket,
    event: &Event,
    scan_event_id: Uuid,
    now: DateTime<Utc>,
) -> ScanOutcome {
    if ticket.event_id != scan_event_id {
        return ScanOutcome::WrongEvent;
    }
    if event.has_ended(now) {
        return ScanOutcome::Expired;
    }
    match ticket.status {
        TicketStatus::Cancelled => ScanOutcome::Cancelled,
        TicketStatus::CheckedIn => ScanOutcome::AlreadyCheckedIn {
            checked_in_at: ticket.checked_in_at,
        },
        TicketStatus::Confirmed => ScanOutcome::Valid {
            ticket_id: ticket.id,
            tier_id: ticket.tier_id,
            holder_id: ticket.holder_id,
        },
    }
}

#[derive(Clone)]
pub struct CheckinService {
    events: Arc<dyn EventRepository>,
    tickets: Arc<dyn TicketRepository>,
    store_timeout: Duration,
}

impl CheckinService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        tickets: Arc<dyn TicketRepository>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            events,
            tickets,
            store_timeout,
        }
    }

    async fn load_event(&self, ticket: &Ticket) -> Result<Event, CoreError> {
        bounded(self.store_timeout, self.events.find(ticket.event_id))
            .await?
            .ok_or_else(|| {
                RepositoryError::Malformed(format!(
                    "ticket {} references missing event {}",
                    ticket.id, ticket.event_id
                ))
                .into()
            })
    }

    /// Classifies a scanned token against the scanning event context.
    /// Read-only.
    pub async fn classify(
        &self,
        token: &str,
        scan_event_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, CoreError> {
        let ticket = bounded(self.store_timeout, self.tickets.find_by_scan_token(token)).await?;
        let Some(ticket) = ticket else {
            return Ok(ScanOutcome::NotFound);
        };
        let event = self.load_event(&ticket).await?;
        Ok(classify_ticket(&ticket, &event, scan_event_id, now))
    }

    /// Operator confirmation of a previously `Valid` scan. The flip only
    /// happens if the status read immediately before the write is still
    /// `confirmed`; if a second door raced in between, the loser gets the
    /// fresh classification (normally `AlreadyCheckedIn`) instead of a
    /// double check-in.
    pub async fn confirm(
        &self,
        ticket_id: Uuid,
        scan_event_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, CoreError> {
        let ticket = bounded(self.store_timeout, self.tickets.find(ticket_id))
            .await?
            .ok_or(CoreError::TicketNotFound)?;
        let event = self.load_event(&ticket).await?;

        let classification = classify_ticket(&ticket, &event, scan_event_id, now);
        if !matches!(classification, ScanOutcome::Valid { .. }) {
            return Ok(ConfirmOutcome::Rejected { classification });
        }

        let flipped = bounded(self.store_timeout, self.tickets.try_check_in(ticket_id, now)).await?;
        if flipped {
            info!(%ticket_id, "ticket checked in");
            return Ok(ConfirmOutcome::CheckedIn { checked_in_at: now });
        }

        // Lost the race; report what the ticket looks like now.
        debug!(%ticket_id, "check-in guard rejected, re-classifying");
        let ticket = bounded(self.store_timeout, self.tickets.find(ticket_id))
            .await?
            .ok_or(CoreError::TicketNotFound)?;
        Ok(ConfirmOutcome::Rejected {
            classification: classify_ticket(&ticket, &event, scan_event_id, now),
        })
    }
}

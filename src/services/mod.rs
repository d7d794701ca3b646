use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::repository::{RepoResult, RepositoryError};

pub mod allocator;
pub mod catalog;
pub mod checkin;
pub mod issuer;
pub mod notify;
pub mod pricing;
pub mod purchase;
pub mod transfer;

pub use allocator::Allocator;
pub use catalog::{Catalog, TierAvailability};
pub use checkin::{CheckinService, ConfirmOutcome, ScanOutcome};
pub use issuer::Issuer;
pub use notify::{Notifier, TracingNotifier};
pub use pricing::{AppliedDiscount, LineItem, Pricing, PromoRejection, Quote};
pub use purchase::{PaymentConfirmation, PurchaseReceipt, PurchaseService};
pub use transfer::TransferService;

/// Domain failures. Check-in classifications are deliberately absent:
/// they are ordinary return values (`ScanOutcome`), not errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("insufficient inventory for tier {tier_id}")]
    InsufficientInventory { tier_id: Uuid },

    /// Issuance did not match the reservation it followed. Must reach an
    /// operator; the reservation is left in place for reconciliation.
    #[error("reconciliation required: reserved {reserved}, issued {issued}")]
    Reconciliation { reserved: i32, issued: i32 },

    #[error("ticket has reached its transfer limit")]
    TransferLimitExceeded,

    #[error("ticket is not transferable in its current state")]
    TicketNotTransferable,

    #[error("transfer link has expired")]
    TransferExpired,

    #[error("transfer link was already used")]
    TransferAlreadyConsumed,

    #[error("transfer link not found")]
    TransferNotFound,

    #[error("event not found")]
    EventNotFound,

    #[error("ticket tier not found")]
    TierNotFound,

    #[error("ticket not found")]
    TicketNotFound,

    #[error("invalid request: {0}")]
    Validation(String),

    /// The store did not answer within the configured bound. Retryable by
    /// the caller; never reported as success.
    #[error("store operation timed out")]
    StoreTimeout,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Bounds a store call by the configured timeout. Timeout is a retryable
/// failure, never silently absorbed.
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, CoreError>
where
    F: Future<Output = RepoResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CoreError::StoreTimeout),
    }
}

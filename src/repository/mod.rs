use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, GroupDiscount, PromoCode, Purchase, Ticket, Tier, TransferRequest};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A stored row violated the shapes described in the model layer
    /// (negative quantity, unknown status, wrong currency scale). Rejected
    /// here so services never see malformed data.
    #[error("malformed record: {0}")]
    Malformed(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Event>>;
}

/// The guarded writes here are the core's only defense against oversell.
/// Implementations must make each one a single atomic compare-and-write on
/// the current row; a `false` return means the precondition did not hold
/// and nothing was written.
#[async_trait]
pub trait TierRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Tier>>;

    /// All tiers of an event ordered by `sort_order`.
    async fn list_by_event(&self, event_id: Uuid) -> RepoResult<Vec<Tier>>;

    /// `sold += quantity` iff the tier is active, inside its sale window at
    /// `now`, and `sold + quantity <= capacity`.
    async fn try_reserve(&self, tier_id: Uuid, quantity: i32, now: DateTime<Utc>)
        -> RepoResult<bool>;

    /// `sold -= quantity` iff `sold - quantity >= 0`. Refund/cancel path.
    async fn try_release(&self, tier_id: Uuid, quantity: i32) -> RepoResult<bool>;
}

#[async_trait]
pub trait GroupDiscountRepository: Send + Sync {
    async fn list_active_by_event(&self, event_id: Uuid) -> RepoResult<Vec<GroupDiscount>>;
}

#[async_trait]
pub trait PromoCodeRepository: Send + Sync {
    /// Case-insensitive lookup within one event.
    async fn find_by_code(&self, event_id: Uuid, code: &str) -> RepoResult<Option<PromoCode>>;

    /// `redemption_count += 1` iff the code is still active, unexpired at
    /// `now`, and under its cap. Concurrent redemptions at the cap boundary
    /// must never overshoot `max_uses`.
    async fn try_redeem(&self, promo_id: Uuid, now: DateTime<Utc>) -> RepoResult<bool>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Ticket>>;

    async fn find_by_scan_token(&self, token: &str) -> RepoResult<Option<Ticket>>;

    /// All-or-nothing: either every ticket in the batch is persisted or
    /// none is. Partial issuance against a successful reservation is what
    /// the reconciliation error in the issuer exists to catch.
    async fn insert_batch(&self, tickets: &[Ticket]) -> RepoResult<()>;

    /// `confirmed -> checked_in` iff the status read immediately before the
    /// write is still `confirmed`. `false` means a racing scan won.
    async fn try_check_in(&self, ticket_id: Uuid, at: DateTime<Utc>) -> RepoResult<bool>;
}

#[async_trait]
pub trait TransferRepository: Send + Sync {
    async fn insert(&self, request: &TransferRequest) -> RepoResult<()>;

    async fn find_by_token(&self, token: &str) -> RepoResult<Option<TransferRequest>>;

    /// One atomic operation: mark the request consumed (iff unconsumed and
    /// unexpired at `now`), reassign the ticket to `new_holder`, and bump
    /// its transfer count. `false` means a racing accept consumed it first
    /// (or the ticket itself stopped being transferable).
    async fn try_consume(
        &self,
        request_id: Uuid,
        new_holder: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;
}

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn insert(&self, purchase: &Purchase) -> RepoResult<()>;
}

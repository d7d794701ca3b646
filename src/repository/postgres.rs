use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Event, GroupDiscount, PromoCode, Purchase, Ticket, TicketStatus, Tier, TransferRequest,
    TRANSFER_LIMIT,
};

use super::{
    EventRepository, GroupDiscountRepository, PromoCodeRepository, PurchaseRepository,
    RepoResult, RepositoryError, TicketRepository, TierRepository, TransferRepository,
};

/// Postgres-backed store. Every guarded write is a single conditional
/// `UPDATE` whose row count tells the caller whether the precondition held
/// at write time.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn validate_tier(tier: Tier) -> RepoResult<Tier> {
    if tier.sold < 0 || tier.capacity < 0 || tier.sold > tier.capacity {
        return Err(RepositoryError::Malformed(format!(
            "tier {} has sold={} capacity={}",
            tier.id, tier.sold, tier.capacity
        )));
    }
    Ok(tier)
}

fn validate_ticket(ticket: Ticket) -> RepoResult<Ticket> {
    if ticket.transfer_count < 0 || ticket.transfer_count > TRANSFER_LIMIT {
        return Err(RepositoryError::Malformed(format!(
            "ticket {} has transfer_count={}",
            ticket.id, ticket.transfer_count
        )));
    }
    Ok(ticket)
}

#[async_trait]
impl EventRepository for PgStore {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }
}

#[async_trait]
impl TierRepository for PgStore {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Tier>> {
        let tier = sqlx::query_as::<_, Tier>("SELECT * FROM tiers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        tier.map(validate_tier).transpose()
    }

    async fn list_by_event(&self, event_id: Uuid) -> RepoResult<Vec<Tier>> {
        let tiers = sqlx::query_as::<_, Tier>(
            "SELECT * FROM tiers WHERE event_id = $1 ORDER BY sort_order, created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        tiers.into_iter().map(validate_tier).collect()
    }

    async fn try_reserve(
        &self,
        tier_id: Uuid,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE tiers
             SET sold = sold + $2, updated_at = $3
             WHERE id = $1
               AND is_active
               AND (sale_start IS NULL OR sale_start <= $3)
               AND (sale_end IS NULL OR sale_end >= $3)
               AND sold + $2 <= capacity",
        )
        .bind(tier_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn try_release(&self, tier_id: Uuid, quantity: i32) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE tiers
             SET sold = sold - $2, updated_at = $3
             WHERE id = $1 AND sold - $2 >= 0",
        )
        .bind(tier_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl GroupDiscountRepository for PgStore {
    async fn list_active_by_event(&self, event_id: Uuid) -> RepoResult<Vec<GroupDiscount>> {
        let discounts = sqlx::query_as::<_, GroupDiscount>(
            "SELECT * FROM group_discounts WHERE event_id = $1 AND is_active",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(discounts)
    }
}

#[async_trait]
impl PromoCodeRepository for PgStore {
    async fn find_by_code(&self, event_id: Uuid, code: &str) -> RepoResult<Option<PromoCode>> {
        let promo = sqlx::query_as::<_, PromoCode>(
            "SELECT * FROM promo_codes WHERE event_id = $1 AND lower(code) = lower($2)",
        )
        .bind(event_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(promo)
    }

    async fn try_redeem(&self, promo_id: Uuid, now: DateTime<Utc>) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE promo_codes
             SET redemption_count = redemption_count + 1, updated_at = $2
             WHERE id = $1
               AND is_active
               AND (expires_at IS NULL OR expires_at >= $2)
               AND (max_uses IS NULL OR redemption_count < max_uses)",
        )
        .bind(promo_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl TicketRepository for PgStore {
    async fn find(&self, id: Uuid) -> RepoResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        ticket.map(validate_ticket).transpose()
    }

    async fn find_by_scan_token(&self, token: &str) -> RepoResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE scan_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        ticket.map(validate_ticket).transpose()
    }

    async fn insert_batch(&self, tickets: &[Ticket]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        for ticket in tickets {
            sqlx::query(
                "INSERT INTO tickets
                   (id, event_id, tier_id, holder_id, scan_token, price_paid,
                    currency, status, checked_in_at, transfer_count,
                    created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(ticket.id)
            .bind(ticket.event_id)
            .bind(ticket.tier_id)
            .bind(ticket.holder_id)
            .bind(&ticket.scan_token)
            .bind(ticket.price_paid)
            .bind(&ticket.currency)
            .bind(ticket.status)
            .bind(ticket.checked_in_at)
            .bind(ticket.transfer_count)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn try_check_in(&self, ticket_id: Uuid, at: DateTime<Utc>) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE tickets
             SET status = $3, checked_in_at = $2, updated_at = $2
             WHERE id = $1 AND status = $4",
        )
        .bind(ticket_id)
        .bind(at)
        .bind(TicketStatus::CheckedIn)
        .bind(TicketStatus::Confirmed)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl TransferRepository for PgStore {
    async fn insert(&self, request: &TransferRequest) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO transfer_requests
               (id, ticket_id, recipient_contact, token, expires_at,
                consumed, consumed_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(request.id)
        .bind(request.ticket_id)
        .bind(&request.recipient_contact)
        .bind(&request.token)
        .bind(request.expires_at)
        .bind(request.consumed)
        .bind(request.consumed_by)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> RepoResult<Option<TransferRequest>> {
        let request = sqlx::query_as::<_, TransferRequest>(
            "SELECT * FROM transfer_requests WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn try_consume(
        &self,
        request_id: Uuid,
        new_holder: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let ticket_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE transfer_requests
             SET consumed = TRUE, consumed_by = $2, updated_at = $3
             WHERE id = $1 AND consumed = FALSE AND expires_at >= $3
             RETURNING ticket_id",
        )
        .bind(request_id)
        .bind(new_holder)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(ticket_id) = ticket_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        let reassigned = sqlx::query(
            "UPDATE tickets
             SET holder_id = $2, transfer_count = transfer_count + 1, updated_at = $3
             WHERE id = $1 AND status = $4 AND transfer_count < $5",
        )
        .bind(ticket_id)
        .bind(new_holder)
        .bind(now)
        .bind(TicketStatus::Confirmed)
        .bind(TRANSFER_LIMIT)
        .execute(&mut *tx)
        .await?;

        if reassigned.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl PurchaseRepository for PgStore {
    async fn insert(&self, purchase: &Purchase) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO purchases
               (id, event_id, buyer_id, quantity, subtotal, discount, total,
                currency, promo_code_id, payment_method, payment_reference,
                created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(purchase.id)
        .bind(purchase.event_id)
        .bind(purchase.buyer_id)
        .bind(purchase.quantity)
        .bind(purchase.subtotal)
        .bind(purchase.discount)
        .bind(purchase.total)
        .bind(&purchase.currency)
        .bind(purchase.promo_code_id)
        .bind(&purchase.payment_method)
        .bind(&purchase.payment_reference)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

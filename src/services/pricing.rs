//! Discount resolution and final pricing.
//!
//! All arithmetic happens in integer minor-currency units (cents); the
//! quote is rounded half-up to two decimals exactly once, at the end, and
//! only then converted back to `Decimal` for the boundary.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{DiscountKind, Event, GroupDiscount, PromoCode};
use crate::repository::{
    GroupDiscountRepository, PromoCodeRepository, RepositoryError, TierRepository,
};

use super::{bounded, CoreError};

const MINOR_PER_MAJOR: i64 = 100;
const BASIS_POINTS: i128 = 10_000;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LineItem {
    pub tier_id: Uuid,
    pub quantity: i32,
}

/// Why a supplied promo code did not resolve. Never blocks the order; the
/// caller decides whether to proceed without the discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoRejection {
    NotFound,
    Inactive,
    Expired,
    Exhausted,
}

impl std::fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            PromoRejection::NotFound => "code not recognized",
            PromoRejection::Inactive => "code is no longer active",
            PromoRejection::Expired => "code has expired",
            PromoRejection::Exhausted => "code has reached its redemption limit",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppliedDiscount {
    None,
    /// A resolved promo code is the sole discount source; qualifying group
    /// discounts are ignored while one applies.
    Promo { promo_id: Uuid, code: String },
    Group { discount_id: Uuid, percent: i32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub applied: AppliedDiscount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_rejection: Option<PromoRejection>,
}

struct PricedLine {
    unit_price_minor: i64,
    quantity: i64,
}

/// Exact conversion to minor units; `None` if the amount carries
/// sub-cent precision.
fn to_minor(amount: Decimal) -> Option<i64> {
    let scaled = amount * Decimal::from(MINOR_PER_MAJOR);
    if scaled.fract().is_zero() {
        scaled.to_i64()
    } else {
        None
    }
}

fn from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Percentage to basis points, exact to 0.01%.
fn to_basis_points(percent: Decimal) -> Option<i64> {
    let scaled = percent * Decimal::from(100);
    if scaled.fract().is_zero() {
        scaled.to_i64()
    } else {
        None
    }
}

/// Half-up integer division for non-negative operands.
fn div_round_half_up(numerator: i128, denominator: i128) -> i64 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let rounded = if remainder * 2 >= denominator {
        quotient + 1
    } else {
        quotient
    };
    rounded as i64
}

fn apply_percentage(subtotal_minor: i64, basis_points: i64) -> i64 {
    let keep = BASIS_POINTS - i128::from(basis_points);
    div_round_half_up(i128::from(subtotal_minor) * keep, BASIS_POINTS)
}

/// Pure resolution over already-priced lines. Deterministic in its inputs,
/// so repeated calls with the same tuple always produce the same totals.
fn resolve(
    lines: &[PricedLine],
    promo: Option<&PromoCode>,
    groups: &[GroupDiscount],
) -> Result<(i64, i64, AppliedDiscount), CoreError> {
    let mut subtotal_minor: i64 = 0;
    let mut total_quantity: i64 = 0;
    for line in lines {
        let line_total = line
            .unit_price_minor
            .checked_mul(line.quantity)
            .and_then(|t| subtotal_minor.checked_add(t))
            .ok_or_else(|| {
                CoreError::Validation("order total exceeds the supported range".into())
            })?;
        subtotal_minor = line_total;
        total_quantity += line.quantity;
    }

    if let Some(promo) = promo {
        let total_minor = match promo.kind {
            DiscountKind::Percentage => {
                let bp = to_basis_points(promo.value)
                    .filter(|bp| (0..=BASIS_POINTS as i64).contains(bp))
                    .ok_or_else(|| {
                        RepositoryError::Malformed(format!(
                            "promo code {} has percentage {}",
                            promo.id, promo.value
                        ))
                    })?;
                apply_percentage(subtotal_minor, bp)
            }
            DiscountKind::Fixed => {
                let fixed_minor = to_minor(promo.value).ok_or_else(|| {
                    RepositoryError::Malformed(format!(
                        "promo code {} has amount {}",
                        promo.id, promo.value
                    ))
                })?;
                // Flat discounts floor at zero; a total is never negative.
                (subtotal_minor - fixed_minor).max(0)
            }
        };
        let applied = AppliedDiscount::Promo {
            promo_id: promo.id,
            code: promo.code.clone(),
        };
        return Ok((subtotal_minor, total_minor, applied));
    }

    let best_group = groups
        .iter()
        .filter(|g| g.is_active && i64::from(g.min_quantity) <= total_quantity)
        .filter(|g| (1..=100).contains(&g.percent))
        .max_by_key(|g| g.percent);

    match best_group {
        Some(group) => {
            let total_minor = apply_percentage(subtotal_minor, i64::from(group.percent) * 100);
            let applied = AppliedDiscount::Group {
                discount_id: group.id,
                percent: group.percent,
            };
            Ok((subtotal_minor, total_minor, applied))
        }
        None => Ok((subtotal_minor, subtotal_minor, AppliedDiscount::None)),
    }
}

fn validate_promo(promo: &PromoCode, now: DateTime<Utc>) -> Result<(), PromoRejection> {
    if !promo.is_active {
        return Err(PromoRejection::Inactive);
    }
    if promo.is_expired(now) {
        return Err(PromoRejection::Expired);
    }
    if promo.is_exhausted() {
        return Err(PromoRejection::Exhausted);
    }
    Ok(())
}

/// Discount resolver. Read-only; never mutates redemption counters.
#[derive(Clone)]
pub struct Pricing {
    tiers: Arc<dyn TierRepository>,
    promos: Arc<dyn PromoCodeRepository>,
    groups: Arc<dyn GroupDiscountRepository>,
    store_timeout: Duration,
}

impl Pricing {
    pub fn new(
        tiers: Arc<dyn TierRepository>,
        promos: Arc<dyn PromoCodeRepository>,
        groups: Arc<dyn GroupDiscountRepository>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            tiers,
            promos,
            groups,
            store_timeout,
        }
    }

    /// Looks up the promo for `code` and validates it against `now`.
    /// Returns the rejection reason as a value; a bad code degrades the
    /// quote to "no discount" rather than failing it.
    pub async fn resolve_promo(
        &self,
        event_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Result<PromoCode, PromoRejection>, CoreError> {
        let promo = bounded(self.store_timeout, self.promos.find_by_code(event_id, code)).await?;
        let Some(promo) = promo else {
            return Ok(Err(PromoRejection::NotFound));
        };
        Ok(match validate_promo(&promo, now) {
            Ok(()) => Ok(promo),
            Err(rejection) => Err(rejection),
        })
    }

    pub async fn quote(
        &self,
        event: &Event,
        items: &[LineItem],
        promo_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Quote, CoreError> {
        if items.is_empty() {
            return Err(CoreError::Validation("order has no line items".into()));
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            if item.quantity <= 0 {
                return Err(CoreError::Validation(format!(
                    "quantity must be positive, got {}",
                    item.quantity
                )));
            }
            let tier = bounded(self.store_timeout, self.tiers.find(item.tier_id))
                .await?
                .filter(|t| t.event_id == event.id)
                .ok_or(CoreError::TierNotFound)?;
            let unit_price_minor = to_minor(tier.price).ok_or_else(|| {
                RepositoryError::Malformed(format!("tier {} has price {}", tier.id, tier.price))
            })?;
            lines.push(PricedLine {
                unit_price_minor,
                quantity: i64::from(item.quantity),
            });
        }

        let (promo, promo_rejection) = match promo_code {
            Some(code) => match self.resolve_promo(event.id, code, now).await? {
                Ok(promo) => (Some(promo), None),
                Err(rejection) => (None, Some(rejection)),
            },
            None => (None, None),
        };

        let groups = bounded(
            self.store_timeout,
            self.groups.list_active_by_event(event.id),
        )
        .await?;

        let (subtotal_minor, total_minor, applied) = resolve(&lines, promo.as_ref(), &groups)?;

        Ok(Quote {
            subtotal: from_minor(subtotal_minor),
            discount: from_minor(subtotal_minor - total_minor),
            total: from_minor(total_minor),
            currency: event.currency.clone(),
            applied,
            promo_rejection,
        })
    }
}

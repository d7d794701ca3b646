use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::{LineItem, PaymentConfirmation};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "entrada-api",
    };

    success(payload, "Health check successful").into_response()
}

pub async fn list_tiers(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let tiers = state
        .catalog
        .list_available_tiers(event_id, Utc::now())
        .await?;
    Ok(success(tiers, "Tiers retrieved").into_response())
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<LineItem>,
    pub promo_code: Option<String>,
}

/// Price preview. No side effects: no reservation, no promo redemption.
pub async fn quote(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<QuoteRequest>,
) -> Result<Response, AppError> {
    let now = Utc::now();
    let event = state.catalog.load_event(event_id).await?;
    let quote = state
        .pricing
        .quote(&event, &body.items, body.promo_code.as_deref(), now)
        .await?;
    Ok(success(quote, "Quote computed").into_response())
}

#[derive(Deserialize)]
pub struct PurchaseRequest {
    pub buyer_id: Uuid,
    pub items: Vec<LineItem>,
    pub promo_code: Option<String>,
    /// Reported back by the payment component after a successful charge.
    pub payment: PaymentConfirmation,
}

pub async fn purchase(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<PurchaseRequest>,
) -> Result<Response, AppError> {
    let receipt = state
        .purchase
        .purchase(
            event_id,
            body.buyer_id,
            &body.items,
            body.promo_code.as_deref(),
            body.payment,
            Utc::now(),
        )
        .await?;
    Ok(created(receipt, "Purchase confirmed").into_response())
}

#[derive(Deserialize)]
pub struct ScanRequest {
    /// Decoded token string from the QR capture layer.
    pub token: String,
}

pub async fn checkin_scan(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<ScanRequest>,
) -> Result<Response, AppError> {
    let outcome = state
        .checkin
        .classify(&body.token, event_id, Utc::now())
        .await?;
    Ok(success(outcome, "Scan classified").into_response())
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub ticket_id: Uuid,
}

pub async fn checkin_confirm(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<ConfirmRequest>,
) -> Result<Response, AppError> {
    let outcome = state
        .checkin
        .confirm(body.ticket_id, event_id, Utc::now())
        .await?;
    Ok(success(outcome, "Check-in processed").into_response())
}

#[derive(Deserialize)]
pub struct CreateTransferRequest {
    pub recipient_contact: String,
}

#[derive(Serialize)]
struct TransferCreatedPayload {
    transfer_id: Uuid,
    token: String,
    expires_at: chrono::DateTime<Utc>,
}

pub async fn create_transfer(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<CreateTransferRequest>,
) -> Result<Response, AppError> {
    let request = state
        .transfer
        .create_transfer(ticket_id, &body.recipient_contact, Utc::now())
        .await?;
    let payload = TransferCreatedPayload {
        transfer_id: request.id,
        token: request.token,
        expires_at: request.expires_at,
    };
    Ok(created(payload, "Transfer created").into_response())
}

#[derive(Deserialize)]
pub struct AcceptTransferRequest {
    pub token: String,
    pub holder_id: Uuid,
}

pub async fn accept_transfer(
    State(state): State<AppState>,
    Json(body): Json<AcceptTransferRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .transfer
        .accept_transfer(&body.token, body.holder_id, Utc::now())
        .await?;
    Ok(success(ticket, "Transfer accepted").into_response())
}

use axum::{
    routing::{get, post},
    Router,
};

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    accept_transfer, checkin_confirm, checkin_scan, create_transfer, health_check, list_tiers,
    purchase, quote,
};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events/:event_id/tiers", get(list_tiers))
        .route("/events/:event_id/quote", post(quote))
        .route("/events/:event_id/purchase", post(purchase))
        .route("/events/:event_id/checkin/scan", post(checkin_scan))
        .route("/events/:event_id/checkin/confirm", post(checkin_confirm))
        .route("/tickets/:ticket_id/transfer", post(create_transfer))
        .route("/transfers/accept", post(accept_transfer))
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}

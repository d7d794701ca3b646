use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::services::CoreError;
use crate::utils::response::error as error_response;

/// Transport-level error. Domain failures arrive wrapped as `Core`; the
/// mapping below decides status, stable error code, and what the client is
/// allowed to see. Check-in classifications never pass through here, they
/// are 200-level values.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Core(core) => match core {
                CoreError::InsufficientInventory { .. }
                | CoreError::TransferLimitExceeded
                | CoreError::TicketNotTransferable
                | CoreError::TransferAlreadyConsumed => StatusCode::CONFLICT,
                CoreError::TransferExpired => StatusCode::GONE,
                CoreError::EventNotFound
                | CoreError::TierNotFound
                | CoreError::TicketNotFound
                | CoreError::TransferNotFound => StatusCode::NOT_FOUND,
                CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::StoreTimeout => StatusCode::GATEWAY_TIMEOUT,
                CoreError::Reconciliation { .. } | CoreError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
            AppError::Core(core) => match core {
                CoreError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
                CoreError::Reconciliation { .. } => "RECONCILIATION_ERROR",
                CoreError::TransferLimitExceeded => "TRANSFER_LIMIT_EXCEEDED",
                CoreError::TicketNotTransferable => "TICKET_NOT_TRANSFERABLE",
                CoreError::TransferExpired => "TRANSFER_EXPIRED",
                CoreError::TransferAlreadyConsumed => "TRANSFER_ALREADY_CONSUMED",
                CoreError::TransferNotFound => "TRANSFER_NOT_FOUND",
                CoreError::EventNotFound => "EVENT_NOT_FOUND",
                CoreError::TierNotFound => "TIER_NOT_FOUND",
                CoreError::TicketNotFound => "TICKET_NOT_FOUND",
                CoreError::Validation(_) => "VALIDATION_ERROR",
                CoreError::StoreTimeout => "STORE_TIMEOUT",
                CoreError::Repository(_) => "DATABASE_ERROR",
            },
        }
    }

    fn log(&self) {
        if self.status_code().is_server_error() {
            error!(error = ?self, "Application error");
        } else {
            warn!(error = %self, "Request rejected");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level messages; storage internals stay in the log
        let public_message = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
            AppError::Core(core) => match core {
                CoreError::Repository(_) => "A storage error occurred".to_string(),
                CoreError::Reconciliation { .. } => {
                    "Purchase could not be completed; support has been notified".to_string()
                }
                other => other.to_string(),
            },
        };

        error_response(code, public_message, None, status)
    }
}

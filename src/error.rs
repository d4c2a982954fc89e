//! Application error type and its HTTP mapping.
//!
//! Client-caused errors carry their message to the caller. Anything that maps
//! to a 5xx is logged with its full detail and answered with a generic body,
//! so provider responses and configuration values never reach the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    /// A dependency is not configured or not reachable.
    #[error("{0}")]
    Unavailable(String),

    #[error("License store is not available")]
    StoreUnavailable,

    #[error("Payment provider credentials are not configured")]
    CredentialsMissing,

    #[error("Access token request failed with status {status}: {body}")]
    TokenRequestFailed { status: u16, body: String },

    #[error("{service} error: {detail}")]
    Upstream { service: &'static str, detail: String },

    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),

    #[error("Payment not completed (status {status})")]
    PaymentNotCompleted {
        status: String,
        details: serde_json::Value,
    },

    #[error("Email send failed: {0}")]
    EmailSendFailed(String),

    #[error("License write failed: {0}")]
    WriteFailure(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::PaymentNotCompleted { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) | AppError::StoreUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::CredentialsMissing
            | AppError::TokenRequestFailed { .. }
            | AppError::Upstream { .. }
            | AppError::MalformedProviderResponse(_)
            | AppError::EmailSendFailed(_)
            | AppError::WriteFailure(_)
            | AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Unavailable(msg) => {
                msg.clone()
            }
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::StoreUnavailable => "License database is not available".to_string(),
            AppError::PaymentNotCompleted { .. } => "Payment not completed".to_string(),
            AppError::EmailSendFailed(_) => "Failed to send email".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(%status, error = %self, "Request failed");
        } else {
            tracing::debug!(%status, error = %self, "Request rejected");
        }

        let details = match &self {
            AppError::PaymentNotCompleted { details, .. } => Some(details.clone()),
            _ => None,
        };

        let body = ErrorBody {
            error: self.public_message(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::extractors::Json;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
}

pub async fn status(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    match state.fulfillment.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                message: "Server is running and database is connected",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(StatusResponse {
                    message: "Server is running but database is not available",
                }),
            )
        }
    }
}

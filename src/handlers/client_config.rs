use axum::extract::State;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfigResponse {
    pub paypal_client_id: String,
}

/// Public settings the checkout page needs to render the payment button.
pub async fn client_config(State(state): State<AppState>) -> Result<Json<ClientConfigResponse>> {
    let paypal_client_id = state
        .paypal_client_id
        .clone()
        .ok_or_else(|| AppError::Internal("PAYPAL_CLIENT_ID is not configured".into()))?;

    Ok(Json(ClientConfigResponse { paypal_client_id }))
}

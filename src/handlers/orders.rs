use axum::{extract::State, http::HeaderMap};
use serde::Serialize;

use crate::error::Result;
use crate::extractors::Json;
use crate::fulfillment::CaptureOrderRequest;
use crate::state::AppState;
use crate::util::extract_request_info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOrderResponse {
    pub license_key: String,
    pub transaction_id: String,
}

/// Returns the provider's order body as-is; the checkout button reads `id` from it.
pub async fn create_order(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let order = state.fulfillment.create_order().await?;
    Ok(Json(order))
}

pub async fn capture_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CaptureOrderRequest>,
) -> Result<Json<CaptureOrderResponse>> {
    let (ip, user_agent) = extract_request_info(&headers);
    tracing::info!(
        order_id = request.order_id.as_deref().unwrap_or_default(),
        ip = ip.as_deref().unwrap_or("unknown"),
        user_agent = user_agent.as_deref().unwrap_or("unknown"),
        "Capture requested"
    );

    let issued = state.fulfillment.capture_and_issue_license(&request).await?;

    Ok(Json(CaptureOrderResponse {
        license_key: issued.license_key,
        transaction_id: issued.transaction_id,
    }))
}

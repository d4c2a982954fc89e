use axum::{extract::State, http::HeaderMap};
use serde::Serialize;

use crate::error::Result;
use crate::extractors::Json;
use crate::fulfillment::ContactRequest;
use crate::state::AppState;
use crate::util::extract_request_info;

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub message: &'static str,
}

pub async fn send_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ContactRequest>,
) -> Result<Json<ContactResponse>> {
    let (ip, _) = extract_request_info(&headers);
    tracing::debug!(ip = ip.as_deref().unwrap_or("unknown"), "Contact form submitted");

    state.fulfillment.relay_contact_message(&request).await?;

    Ok(Json(ContactResponse {
        message: "Email sent successfully",
    }))
}

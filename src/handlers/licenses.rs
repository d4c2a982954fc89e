use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::error::Result;
use crate::extractors::Json;
use crate::fulfillment::CreateLicenseRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LicenseCreatedResponse {
    pub message: &'static str,
    pub id: String,
}

pub async fn create_license(
    State(state): State<AppState>,
    Json(request): Json<CreateLicenseRequest>,
) -> Result<(StatusCode, Json<LicenseCreatedResponse>)> {
    let id = state.fulfillment.record_license(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(LicenseCreatedResponse {
            message: "License created successfully",
            id,
        }),
    ))
}

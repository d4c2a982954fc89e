use axum::extract::State;

use crate::error::Result;
use crate::extractors::{Json, Query};
use crate::fulfillment::VerifyQuery;
use crate::models::VerifiedLicense;
use crate::state::AppState;

pub async fn verify_license(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifiedLicense>> {
    let verified = state.fulfillment.verify(&query).await?;
    Ok(Json(verified))
}

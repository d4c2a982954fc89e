use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;
use crate::util::extract_bearer_token;

/// Guard administrative routes with the configured bearer key.
///
/// Without `ADMIN_API_KEY` the route is open, as it was before the key
/// existed; startup logs a warning in that case.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.admin_api_key.as_deref() {
        let provided = extract_bearer_token(request.headers()).unwrap_or_default();
        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request");
            return Err(AppError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

//! Shared request helpers.

use axum::http::HeaderMap;

use crate::error::{AppError, Result};

/// Extract client IP address and user-agent from request headers.
///
/// Tries `x-forwarded-for` first (for proxied requests), then `x-real-ip`.
pub fn extract_request_info(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    (ip, user_agent)
}

/// Extract a Bearer token from the Authorization header.
///
/// Returns the token string without the "Bearer " prefix, or None if
/// the header is missing, malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Trimmed value of an optional field, treating blank strings as absent.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// All named fields, trimmed, or a single `BadRequest` naming every missing one.
pub fn require_all<'a, const N: usize>(
    fields: [(&'static str, &'a Option<String>); N],
) -> Result<[&'a str; N]> {
    let mut values = [""; N];
    let mut missing = Vec::new();

    for (i, (name, value)) in fields.into_iter().enumerate() {
        match present(value) {
            Some(v) => values[i] = v,
            None => missing.push(name),
        }
    }

    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    Ok(values)
}

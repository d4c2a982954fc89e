mod client_config;
mod contact;
mod licenses;
mod orders;
mod status;
mod verify;

pub use client_config::*;
pub use contact::*;
pub use licenses::*;
pub use orders::*;
pub use status::*;
pub use verify::*;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{Config, RateLimit};
use crate::middleware::admin_auth;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 64 * 1024;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Per-IP limit for routes that cost a provider call or a lookup.
/// Keys on `X-Forwarded-For` / `X-Real-IP` / `Forwarded`, falling back to the
/// peer address, so the server must be started with
/// `into_make_service_with_connect_info`.
fn rate_limited(routes: Router<AppState>, limit: Option<RateLimit>) -> Router<AppState> {
    let Some(limit) = limit else {
        return routes;
    };

    let Some(governor) = GovernorConfigBuilder::default()
        .per_millisecond(limit.replenish_interval_ms())
        .burst_size(limit.burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
    else {
        tracing::warn!(?limit, "Invalid rate limit settings, rate limiting disabled");
        return routes;
    };

    routes.layer(GovernorLayer::new(Arc::new(governor)))
}

pub fn router(state: AppState, config: &Config) -> Router {
    let public_routes = Router::new()
        .route("/status", get(status))
        .route("/config", get(client_config));

    let limited_routes = rate_limited(
        Router::new()
            .route("/create-order", post(create_order))
            .route("/capture-order", post(capture_order))
            .route("/send-email", post(send_email))
            .route("/verify", get(verify_license)),
        config.rate_limit,
    );

    let admin_routes = Router::new()
        .route("/license", post(create_license))
        .route_layer(from_fn_with_state(state.clone(), admin_auth));

    public_routes
        .merge(limited_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors_allowed_origins)),
        )
        .with_state(state)
}

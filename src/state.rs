use std::sync::Arc;

use crate::config::Config;
use crate::fulfillment::OrderFulfillment;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub fulfillment: Arc<OrderFulfillment>,
    /// Public client id handed to the checkout button
    pub paypal_client_id: Option<String>,
    pub admin_api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(fulfillment: OrderFulfillment, config: &Config) -> Self {
        Self {
            fulfillment: Arc::new(fulfillment),
            paypal_client_id: config.paypal.client_id.clone(),
            admin_api_key: config.admin_api_key.as_deref().map(Arc::from),
        }
    }
}

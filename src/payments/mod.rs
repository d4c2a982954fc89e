mod paypal;

pub use paypal::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::Result;

/// Which PayPal deployment to talk to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PaypalEnvironment {
    #[default]
    Sandbox,
    #[strum(to_string = "production", serialize = "live")]
    Production,
}

impl PaypalEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            PaypalEnvironment::Sandbox => "https://api-m.sandbox.paypal.com",
            PaypalEnvironment::Production => "https://api-m.paypal.com",
        }
    }
}

/// Short-lived bearer token. Fetched per operation and never cached.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Remote payment API used by the order workflow.
///
/// Order and capture bodies are returned exactly as the provider sent them.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exchange the configured client credentials for a bearer token.
    async fn access_token(&self) -> Result<AccessToken>;

    /// Create a purchase intent for the single lifetime-license item.
    async fn create_order(&self, token: &AccessToken) -> Result<serde_json::Value>;

    /// Finalize payment for a previously created order.
    async fn capture_order(&self, token: &AccessToken, order_id: &str)
    -> Result<serde_json::Value>;
}

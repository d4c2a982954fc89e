use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};

use super::{AccessToken, PaymentGateway};
use crate::config::PaypalConfig;
use crate::error::{AppError, Result};

pub const PRODUCT_DESCRIPTION: &str = "WhatsApp Pro Chat — Lifetime License";
pub const PRICE_CURRENCY: &str = "USD";
pub const PRICE_VALUE: &str = "49.00";
/// Same price as [`PRICE_VALUE`], as recorded on license documents.
pub const LICENSE_AMOUNT: f64 = 49.0;

pub const CAPTURE_COMPLETED: &str = "COMPLETED";

const SERVICE: &str = "PayPal";

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    intent: &'a str,
    purchase_units: Vec<PurchaseUnitRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct PurchaseUnitRequest<'a> {
    description: &'a str,
    amount: Amount<'a>,
}

#[derive(Debug, Serialize)]
struct Amount<'a> {
    currency_code: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Keep string values only. Error bodies reuse field names like `status`
/// with numeric values.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

/// Typed view over the parts of a capture response the workflow relies on.
/// Every level is optional because PayPal omits them on failed captures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapturedOrder {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default)]
    pub purchase_units: Vec<CapturedPurchaseUnit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapturedPurchaseUnit {
    #[serde(default)]
    pub payments: Option<CapturedPayments>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapturedPayments {
    #[serde(default)]
    pub captures: Vec<Capture>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Capture {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
}

impl CapturedOrder {
    pub fn from_value(raw: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(raw.clone())
            .map_err(|e| AppError::MalformedProviderResponse(format!("capture response: {}", e)))
    }

    /// Status string, or `"UNKNOWN"` when the provider sent none (error bodies).
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("UNKNOWN")
    }

    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some(CAPTURE_COMPLETED)
    }

    /// Id of the first capture of the first purchase unit.
    pub fn transaction_id(&self) -> Result<&str> {
        self.purchase_units
            .first()
            .and_then(|unit| unit.payments.as_ref())
            .and_then(|payments| payments.captures.first())
            .and_then(|capture| capture.id.as_deref())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::MalformedProviderResponse(
                    "missing purchase_units[0].payments.captures[0].id".into(),
                )
            })
    }
}

/// PayPal Orders v2 client.
#[derive(Debug, Clone)]
pub struct PaypalClient {
    client: Client,
    base_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl PaypalClient {
    pub fn new(config: &PaypalConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn upstream(detail: impl Into<String>) -> AppError {
        AppError::Upstream {
            service: SERVICE,
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for PaypalClient {
    async fn access_token(&self) -> Result<AccessToken> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret)
        else {
            return Err(AppError::CredentialsMissing);
        };

        let credentials = BASE64.encode(format!("{}:{}", client_id, client_secret));

        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .header("Authorization", format!("Basic {}", credentials))
            .header("Accept", "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| Self::upstream(format!("token request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, body = %body, "PayPal token request rejected");
            return Err(AppError::TokenRequestFailed { status, body });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::MalformedProviderResponse(format!("token response: {}", e))
        })?;

        Ok(AccessToken::new(token.access_token))
    }

    async fn create_order(&self, token: &AccessToken) -> Result<serde_json::Value> {
        let request = CreateOrderRequest {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnitRequest {
                description: PRODUCT_DESCRIPTION,
                amount: Amount {
                    currency_code: PRICE_CURRENCY,
                    value: PRICE_VALUE,
                },
            }],
        };

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(token.secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::upstream(format!("create order: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "PayPal rejected order creation");
            return Err(Self::upstream(format!("create order: {} - {}", status, body)));
        }

        response.json().await.map_err(|e| {
            AppError::MalformedProviderResponse(format!("create order response: {}", e))
        })
    }

    /// Client errors with a JSON body (e.g. `ORDER_ALREADY_CAPTURED`) come back
    /// as the raw body so the caller can report the capture as not completed.
    async fn capture_order(
        &self,
        token: &AccessToken,
        order_id: &str,
    ) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(format!("{}/v2/checkout/orders/{}/capture", self.base_url, order_id))
            .bearer_auth(token.secret())
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Self::upstream(format!("capture order: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let declined = status.is_client_error() && status != StatusCode::UNAUTHORIZED;
        if (status.is_success() || declined)
            && let Ok(json) = serde_json::from_str::<serde_json::Value>(&body)
        {
            if declined {
                tracing::warn!(status = %status, order_id, "PayPal declined capture");
            }
            return Ok(json);
        }

        tracing::error!(status = %status, body = %body, order_id, "PayPal capture failed");
        Err(Self::upstream(format!("capture order: {} - {}", status, body)))
    }
}

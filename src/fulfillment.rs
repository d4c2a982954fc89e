//! Order fulfillment: create order, capture and issue a license, verify.
//!
//! A capture runs strictly in order:
//!
//! ```text
//! TOKEN_ACQUIRED -> CAPTURE_REQUESTED -> CAPTURE_COMPLETED | CAPTURE_REJECTED
//!     -> LICENSE_PERSISTED | LICENSE_PERSIST_FAILED -> NOTIFIED | NOTIFY_FAILED
//! ```
//!
//! Nothing is rolled back. Once the provider reports the capture as completed
//! the call succeeds: a failed license write or email becomes a critical log
//! entry (and a line in the admin email) instead of an error for the customer.

use std::sync::Arc;

use serde::Deserialize;
use strum::Display;

use crate::email::templates::{self, SaleNotice};
use crate::email::{EmailMessage, Notifier};
use crate::error::{AppError, Result};
use crate::keys::generate_license_key;
use crate::models::{ContactMessage, LicenseFilter, NewLicense, VerifiedLicense};
use crate::payments::{CapturedOrder, LICENSE_AMOUNT, PaymentGateway};
use crate::store::LicenseStore;
use crate::util::{present, require_all};

/// Uniform answer for any failed verification, whichever field mismatched.
pub const INVALID_LICENSE_MESSAGE: &str = "Invalid license key or domain";

const MAX_ORDER_ID_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureStage {
    TokenAcquired,
    CaptureRequested,
    CaptureCompleted,
    CaptureRejected,
    LicensePersisted,
    LicensePersistFailed,
    Notified,
    NotifyFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceOutcome {
    Saved { id: String },
    Failed { reason: String },
}

impl PersistenceOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistenceOutcome::Saved { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    /// Email delivery or the recipient is not configured
    Skipped,
    Failed { reason: String },
}

/// What a completed capture produced. Only the key and transaction id reach
/// the client; the rest is for logs and tests.
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    pub license_key: String,
    pub transaction_id: String,
    pub persistence: PersistenceOutcome,
    pub customer_notification: NotificationOutcome,
    pub admin_notification: NotificationOutcome,
}

impl IssuedLicense {
    pub fn final_stage(&self) -> CaptureStage {
        let notified = matches!(self.customer_notification, NotificationOutcome::Sent)
            && matches!(
                self.admin_notification,
                NotificationOutcome::Sent | NotificationOutcome::Skipped
            );
        if notified {
            CaptureStage::Notified
        } else {
            CaptureStage::NotifyFailed
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CaptureOrderRequest {
    #[serde(rename = "orderID", alias = "orderId")]
    pub order_id: Option<String>,
    pub domain: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    pub key: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateLicenseRequest {
    pub license: Option<String>,
    pub domain: Option<String>,
    pub email: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FulfillmentSettings {
    pub license_key_prefix: String,
    pub email_from: String,
    pub admin_email: Option<String>,
    pub verify_require_key: bool,
}

/// PayPal order ids are short uppercase alphanumerics; anything else never
/// reaches the provider URL.
fn is_valid_order_id(order_id: &str) -> bool {
    order_id.len() <= MAX_ORDER_ID_LEN
        && order_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub struct OrderFulfillment {
    payments: Arc<dyn PaymentGateway>,
    licenses: Option<Arc<dyn LicenseStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    settings: FulfillmentSettings,
}

impl OrderFulfillment {
    pub fn new(
        payments: Arc<dyn PaymentGateway>,
        licenses: Option<Arc<dyn LicenseStore>>,
        notifier: Option<Arc<dyn Notifier>>,
        settings: FulfillmentSettings,
    ) -> Self {
        Self {
            payments,
            licenses,
            notifier,
            settings,
        }
    }

    fn store(&self) -> Result<&Arc<dyn LicenseStore>> {
        self.licenses.as_ref().ok_or(AppError::StoreUnavailable)
    }

    /// Ping the license store.
    pub async fn health(&self) -> Result<()> {
        self.store()?.ping().await
    }

    /// Create a provider order and return its body unchanged.
    pub async fn create_order(&self) -> Result<serde_json::Value> {
        let token = self.payments.access_token().await?;
        let order = self.payments.create_order(&token).await?;

        tracing::info!(
            order_id = order.get("id").and_then(|v| v.as_str()).unwrap_or("unknown"),
            status = order.get("status").and_then(|v| v.as_str()).unwrap_or("unknown"),
            "Payment order created"
        );
        Ok(order)
    }

    /// Capture `orderID` and, if the provider completed it, issue, persist and
    /// announce a license for `domain`.
    pub async fn capture_and_issue_license(
        &self,
        request: &CaptureOrderRequest,
    ) -> Result<IssuedLicense> {
        let [order_id, domain, email] = require_all([
            ("orderID", &request.order_id),
            ("domain", &request.domain),
            ("email", &request.email),
        ])?;
        if !is_valid_order_id(order_id) {
            return Err(AppError::BadRequest("Invalid orderID".into()));
        }

        let token = self.payments.access_token().await?;
        tracing::debug!(order_id, stage = %CaptureStage::TokenAcquired, "Access token acquired");

        tracing::debug!(order_id, stage = %CaptureStage::CaptureRequested, "Capturing order");
        let raw = self.payments.capture_order(&token, order_id).await?;
        let captured = CapturedOrder::from_value(&raw)?;

        if !captured.is_completed() {
            tracing::warn!(
                order_id,
                domain,
                status = captured.status(),
                stage = %CaptureStage::CaptureRejected,
                "Capture not completed, no license issued"
            );
            return Err(AppError::PaymentNotCompleted {
                status: captured.status().to_string(),
                details: raw,
            });
        }

        let transaction_id = match captured.transaction_id() {
            Ok(id) => id.to_string(),
            Err(e) => {
                tracing::error!(
                    severity = "critical",
                    order_id,
                    domain,
                    email,
                    error = %e,
                    "Payment completed but capture id is missing, no license issued"
                );
                return Err(e);
            }
        };

        let license_key = generate_license_key(&self.settings.license_key_prefix);
        tracing::info!(
            order_id,
            domain,
            transaction_id = %transaction_id,
            license_key = %license_key,
            stage = %CaptureStage::CaptureCompleted,
            "Payment captured"
        );

        let persistence = self
            .persist_issued(NewLicense {
                license: license_key.clone(),
                domain: domain.to_string(),
                email: email.to_string(),
                amount: LICENSE_AMOUNT,
                transaction_id: Some(transaction_id.clone()),
            })
            .await;

        let sale = SaleNotice {
            license_key: &license_key,
            domain,
            email,
            amount: LICENSE_AMOUNT,
            order_id,
            transaction_id: &transaction_id,
            persistence: &persistence,
        };
        let (customer_notification, admin_notification) = tokio::join!(
            self.notify_customer(&sale),
            self.notify_admin(&sale)
        );

        let issued = IssuedLicense {
            license_key,
            transaction_id,
            persistence,
            customer_notification,
            admin_notification,
        };

        tracing::info!(
            order_id,
            domain,
            transaction_id = %issued.transaction_id,
            persisted = issued.persistence.is_saved(),
            stage = %issued.final_stage(),
            "License issued"
        );
        Ok(issued)
    }

    async fn persist_issued(&self, license: NewLicense) -> PersistenceOutcome {
        let domain = license.domain.clone();
        let email = license.email.clone();
        let license_key = license.license.clone();
        let transaction_id = license.transaction_id.clone().unwrap_or_default();

        let result = match self.store() {
            Ok(store) => store.insert(license).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(id) => {
                tracing::info!(
                    license_id = %id,
                    transaction_id = %transaction_id,
                    stage = %CaptureStage::LicensePersisted,
                    "License record saved"
                );
                PersistenceOutcome::Saved { id }
            }
            Err(e) => {
                tracing::error!(
                    severity = "critical",
                    error = %e,
                    license_key = %license_key,
                    domain = %domain,
                    email = %email,
                    transaction_id = %transaction_id,
                    stage = %CaptureStage::LicensePersistFailed,
                    "Payment captured but license record was not saved, reconcile manually"
                );
                PersistenceOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn deliver(
        &self,
        message: EmailMessage,
        audience: &'static str,
        sale: &SaleNotice<'_>,
    ) -> NotificationOutcome {
        let Some(notifier) = &self.notifier else {
            tracing::warn!(
                audience,
                transaction_id = %sale.transaction_id,
                "Email is not configured, notification skipped"
            );
            return NotificationOutcome::Skipped;
        };

        match notifier.send(&message).await {
            Ok(()) => NotificationOutcome::Sent,
            Err(e) => {
                tracing::error!(
                    severity = "critical",
                    audience,
                    error = %e,
                    license_key = %sale.license_key,
                    domain = %sale.domain,
                    email = %sale.email,
                    transaction_id = %sale.transaction_id,
                    stage = %CaptureStage::NotifyFailed,
                    "Payment captured but notification email failed"
                );
                NotificationOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn notify_customer(&self, sale: &SaleNotice<'_>) -> NotificationOutcome {
        let rendered = templates::license_issued(sale.license_key, sale.domain, sale.transaction_id);
        let message = EmailMessage {
            from: self.settings.email_from.clone(),
            to: sale.email.to_string(),
            subject: rendered.subject,
            html: rendered.html,
            reply_to: self.settings.admin_email.clone(),
        };
        self.deliver(message, "customer", sale).await
    }

    async fn notify_admin(&self, sale: &SaleNotice<'_>) -> NotificationOutcome {
        let Some(admin_email) = &self.settings.admin_email else {
            tracing::warn!(
                transaction_id = %sale.transaction_id,
                "ADMIN_EMAIL is not configured, sale notification skipped"
            );
            return NotificationOutcome::Skipped;
        };

        let rendered = templates::sale_notification(sale);
        let message = EmailMessage {
            from: self.settings.email_from.clone(),
            to: admin_email.clone(),
            subject: rendered.subject,
            html: rendered.html,
            reply_to: Some(sale.email.to_string()),
        };
        self.deliver(message, "admin", sale).await
    }

    /// Look up a license for a client. Strict mode needs `key` and `domain`;
    /// lenient mode accepts `domain` alone and then matches any license for it.
    pub async fn verify(&self, query: &VerifyQuery) -> Result<VerifiedLicense> {
        let filter = if self.settings.verify_require_key {
            let [key, domain] = require_all([("key", &query.key), ("domain", &query.domain)])?;
            LicenseFilter::by_key_and_domain(key, domain)
        } else {
            let [domain] = require_all([("domain", &query.domain)])?;
            match present(&query.key) {
                Some(key) => LicenseFilter::by_key_and_domain(key, domain),
                None => LicenseFilter::by_domain(domain),
            }
        };

        match self.store()?.find_one(&filter).await? {
            Some(found) => {
                tracing::debug!(license_id = %found.id, domain = %filter.domain, "License verified");
                Ok(found.record.into())
            }
            None => {
                tracing::debug!(domain = %filter.domain, "License verification failed");
                Err(AppError::NotFound(INVALID_LICENSE_MESSAGE.into()))
            }
        }
    }

    /// Administrative insert of a license that did not go through checkout.
    pub async fn record_license(&self, request: &CreateLicenseRequest) -> Result<String> {
        let fields = require_all([
            ("license", &request.license),
            ("domain", &request.domain),
            ("email", &request.email),
        ]);
        let ([license, domain, email], amount) = match (fields, request.amount) {
            (Ok(values), Some(amount)) => (values, amount),
            (Err(AppError::BadRequest(msg)), None) => {
                return Err(AppError::BadRequest(format!("{}, amount", msg)));
            }
            (Err(e), _) => return Err(e),
            (Ok(_), None) => {
                return Err(AppError::BadRequest("Missing required fields: amount".into()));
            }
        };
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::BadRequest("amount must be a non-negative number".into()));
        }

        let id = self
            .store()?
            .insert(NewLicense {
                license: license.to_string(),
                domain: domain.to_string(),
                email: email.to_string(),
                amount,
                transaction_id: None,
            })
            .await?;

        tracing::info!(license_id = %id, domain, "License created manually");
        Ok(id)
    }

    /// Forward a contact-form message to the admin. Unlike sale
    /// notifications, a failed send fails the request.
    pub async fn relay_contact_message(&self, request: &ContactRequest) -> Result<()> {
        let [name, email, subject, message] = require_all([
            ("name", &request.name),
            ("email", &request.email),
            ("subject", &request.subject),
            ("message", &request.message),
        ])?;

        let (Some(notifier), Some(admin_email)) = (&self.notifier, &self.settings.admin_email)
        else {
            return Err(AppError::Unavailable("Email service is not configured".into()));
        };

        let rendered = templates::contact_message(&ContactMessage {
            name: name.to_string(),
            email: email.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        });

        notifier
            .send(&EmailMessage {
                from: self.settings.email_from.clone(),
                to: admin_email.clone(),
                subject: rendered.subject,
                html: rendered.html,
                reply_to: Some(email.to_string()),
            })
            .await?;

        tracing::info!(from = %email, "Contact message forwarded");
        Ok(())
    }
}

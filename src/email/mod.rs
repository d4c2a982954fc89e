//! Transactional email via the Resend API.
//!
//! The workflow talks to a [`Notifier`]; [`ResendMailer`] is the production
//! implementation. Templates live in [`templates`].

pub mod templates;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// One HTML message to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message`. Any transport or provider error is `EmailSendFailed`.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Resend API request body.
#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

/// Resend API response.
#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

#[derive(Clone)]
pub struct ResendMailer {
    api_key: String,
    api_url: String,
    http_client: Client,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_api_url(api_key, RESEND_API_URL)
    }

    /// Point the mailer at a different endpoint (local stub servers).
    pub fn with_api_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            http_client: Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let request = ResendEmailRequest {
            from: &message.from,
            to: vec![&message.to],
            subject: &message.subject,
            html: &message.html,
            reply_to: message.reply_to.as_deref(),
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to send request to Resend API");
                AppError::EmailSendFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Resend API returned error");
            return Err(AppError::EmailSendFailed(format!("{} - {}", status, body)));
        }

        let sent: ResendEmailResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Resend API response");
            AppError::EmailSendFailed("unreadable provider response".into())
        })?;

        tracing::info!(email_id = %sent.id, to = %message.to, subject = %message.subject, "Email sent via Resend");
        Ok(())
    }
}

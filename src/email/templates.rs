//! HTML bodies for customer, admin and contact-form emails.
//!
//! Everything interpolated into markup goes through [`escape_html`].

use crate::fulfillment::PersistenceOutcome;
use crate::models::ContactMessage;
use crate::payments::{PRICE_CURRENCY, PRODUCT_DESCRIPTION};

const BODY_STYLE: &str = "font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub html: String,
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="{}">
<h2 style="color: #333;">{}</h2>
{}
</body>
</html>"#,
        BODY_STYLE,
        escape_html(title),
        content
    )
}

/// Sent to the customer once the payment is captured.
pub fn license_issued(license_key: &str, domain: &str, transaction_id: &str) -> Rendered {
    let title = "Your WhatsApp Pro Chat license";
    let content = format!(
        r#"<p>Thank you for your purchase! Here is your lifetime license key:</p>
<div style="background: #f5f5f5; padding: 20px; border-radius: 8px; text-align: center;">
<code style="font-size: 22px; font-weight: bold; letter-spacing: 2px; color: #333;">{}</code>
</div>
<p>Licensed domain: <strong>{}</strong></p>
<p>Open the extension settings and paste the key to activate Pro features.</p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #999; font-size: 12px;">Transaction ID: {}. Keep this email for your records.</p>"#,
        escape_html(license_key),
        escape_html(domain),
        escape_html(transaction_id),
    );

    Rendered {
        subject: title.to_string(),
        html: page(title, &content),
    }
}

/// Details of a completed sale for the admin notification.
#[derive(Debug, Clone)]
pub struct SaleNotice<'a> {
    pub license_key: &'a str,
    pub domain: &'a str,
    pub email: &'a str,
    pub amount: f64,
    pub order_id: &'a str,
    pub transaction_id: &'a str,
    pub persistence: &'a PersistenceOutcome,
}

/// Sent to the admin for every captured payment. States whether the license
/// record was saved so a failed write can be reconciled by hand.
pub fn sale_notification(sale: &SaleNotice<'_>) -> Rendered {
    let (subject, persistence_line) = match sale.persistence {
        PersistenceOutcome::Saved { id } => (
            format!("New sale: {}", sale.domain),
            format!(
                r#"<p style="color: #2e7d32;">License record saved (id {}).</p>"#,
                escape_html(id)
            ),
        ),
        PersistenceOutcome::Failed { reason } => (
            format!("ACTION REQUIRED: unsaved sale for {}", sale.domain),
            format!(
                r#"<p style="color: #c62828; font-weight: bold;">License record NOT SAVED. Manual reconciliation required: {}</p>"#,
                escape_html(reason)
            ),
        ),
    };

    let content = format!(
        r#"<p>{}</p>
<table style="border-collapse: collapse;">
<tr><td style="padding: 4px 12px 4px 0; color: #666;">Domain</td><td>{}</td></tr>
<tr><td style="padding: 4px 12px 4px 0; color: #666;">Email</td><td>{}</td></tr>
<tr><td style="padding: 4px 12px 4px 0; color: #666;">Amount</td><td>{:.2} {}</td></tr>
<tr><td style="padding: 4px 12px 4px 0; color: #666;">License key</td><td><code>{}</code></td></tr>
<tr><td style="padding: 4px 12px 4px 0; color: #666;">Order ID</td><td>{}</td></tr>
<tr><td style="padding: 4px 12px 4px 0; color: #666;">Transaction ID</td><td>{}</td></tr>
</table>
{}"#,
        escape_html(PRODUCT_DESCRIPTION),
        escape_html(sale.domain),
        escape_html(sale.email),
        sale.amount,
        PRICE_CURRENCY,
        escape_html(sale.license_key),
        escape_html(sale.order_id),
        escape_html(sale.transaction_id),
        persistence_line,
    );

    let html = page(&subject, &content);
    Rendered { subject, html }
}

/// Contact-form submission forwarded to the admin.
pub fn contact_message(message: &ContactMessage) -> Rendered {
    let subject = format!("[Contact] {}", message.subject);
    let body = escape_html(&message.message).replace('\n', "<br>");
    let content = format!(
        r#"<p><strong>From:</strong> {} &lt;{}&gt;</p>
<p><strong>Subject:</strong> {}</p>
<div style="background: #f5f5f5; padding: 16px; border-radius: 8px;">{}</div>"#,
        escape_html(&message.name),
        escape_html(&message.email),
        escape_html(&message.subject),
        body,
    );

    let html = page(&subject, &content);
    Rendered { subject, html }
}

//! Hosted-invoice payment provider client.
//!
//! Invoices are created with `POST /v2/invoices` using the secret key as the
//! basic-auth username. The provider calls back `/payment/webhook` with the
//! shared callback token in `x-callback-token`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use salon_common::{config::PaymentConfig, error::SalonError, models::PaymentStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    cfg: PaymentConfig,
}

#[derive(Debug, Serialize)]
pub struct InvoiceItem {
    pub name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct InvoiceCustomer {
    pub given_names: String,
    pub email: String,
}

/// Body of `POST /v2/invoices`.
#[derive(Debug, Serialize)]
pub struct CreateInvoice {
    pub external_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payer_email: String,
    pub description: String,
    pub invoice_duration: u64,
    pub currency: String,
    pub success_redirect_url: String,
    pub failure_redirect_url: String,
    pub customer: InvoiceCustomer,
    pub items: Vec<InvoiceItem>,
}

/// The parts of the provider's invoice we keep.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub invoice_url: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Paid,
    Expired,
    Other,
}

impl InvoiceStatus {
    /// `SETTLED` means paid and disbursed; both count as paid.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "PAID" | "SETTLED" => Self::Paid,
            "EXPIRED" => Self::Expired,
            _ => Self::Other,
        }
    }
}

/// What a callback should do to the appointment it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Record the payment (and confirm a pending booking)
    MarkPaid,
    /// Mark the current invoice expired
    MarkExpired,
    /// Acknowledge without writing
    Ignore,
}

/// Decide how to apply a callback for invoice `callback_invoice_id`.
///
/// A payment is honoured for any invoice ever issued for the appointment, but
/// only the current invoice may expire it: a late `EXPIRED` for a replaced
/// invoice must not clobber the open one. Already paid appointments are
/// never rewritten.
pub fn callback_action(
    status: InvoiceStatus,
    callback_invoice_id: &str,
    current_invoice_id: Option<&str>,
    payment_status: PaymentStatus,
) -> CallbackAction {
    if payment_status == PaymentStatus::Paid {
        return CallbackAction::Ignore;
    }
    match status {
        InvoiceStatus::Paid => CallbackAction::MarkPaid,
        InvoiceStatus::Expired if current_invoice_id == Some(callback_invoice_id) => {
            CallbackAction::MarkExpired
        }
        InvoiceStatus::Expired | InvoiceStatus::Other => CallbackAction::Ignore,
    }
}

/// Invoice callback body.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceCallback {
    pub id: String,
    pub external_id: String,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub payment_channel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error_code: Option<String>,
    message: Option<String>,
}

impl PaymentClient {
    pub fn new(cfg: &PaymentConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            cfg: cfg.clone(),
        })
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.cfg
    }

    /// Build an invoice body from this client's redirect, duration and currency settings.
    pub fn invoice_for(
        &self,
        external_id: String,
        amount: Decimal,
        payer_name: &str,
        payer_email: &str,
        description: String,
    ) -> CreateInvoice {
        CreateInvoice {
            external_id,
            amount,
            payer_email: payer_email.to_string(),
            items: vec![InvoiceItem {
                name: description.clone(),
                quantity: 1,
                price: amount,
            }],
            description,
            invoice_duration: self.cfg.invoice_duration_secs,
            currency: self.cfg.currency.clone(),
            success_redirect_url: self.cfg.success_redirect_url.clone(),
            failure_redirect_url: self.cfg.failure_redirect_url.clone(),
            customer: InvoiceCustomer {
                given_names: payer_name.to_string(),
                email: payer_email.to_string(),
            },
        }
    }

    pub async fn create_invoice(&self, body: &CreateInvoice) -> Result<Invoice, SalonError> {
        let url = format!("{}/v2/invoices", self.cfg.base_url.trim_end_matches('/'));

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.cfg.secret_key, Some(""))
            .json(body)
            .send()
            .await
            .map_err(|e| SalonError::Payment {
                message: format!("invoice request failed: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<ProviderError>()
                .await
                .ok()
                .map(|e| {
                    format!(
                        "{}: {}",
                        e.error_code.unwrap_or_default(),
                        e.message.unwrap_or_default()
                    )
                })
                .unwrap_or_default();
            return Err(SalonError::Payment {
                message: format!("provider returned {status} {detail}"),
            });
        }

        let invoice = resp.json::<Invoice>().await.map_err(|e| SalonError::Payment {
            message: format!("malformed invoice response: {e}"),
        })?;

        tracing::info!(
            invoice_id = %invoice.id,
            external_id = %body.external_id,
            status = %invoice.status,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Check the webhook's callback token. An unconfigured token rejects everything.
    pub fn verify_callback_token(&self, provided: Option<&str>) -> bool {
        match provided {
            Some(token) if !self.cfg.callback_token.is_empty() => {
                tokens_match(&self.cfg.callback_token, token)
            }
            _ => false,
        }
    }
}

/// Compare fixed-length digests so timing doesn't reveal a shared prefix.
fn tokens_match(expected: &str, provided: &str) -> bool {
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(provided.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(callback_token: &str) -> PaymentClient {
        PaymentClient::new(&PaymentConfig {
            base_url: "https://api.example.com".into(),
            secret_key: "sk_test".into(),
            callback_token: callback_token.into(),
            success_redirect_url: "https://glow.ph/ok".into(),
            failure_redirect_url: "https://glow.ph/fail".into(),
            invoice_duration_secs: 3600,
            currency: "PHP".into(),
        })
        .unwrap()
    }

    #[test]
    fn callback_token_check() {
        let c = client("cb-secret");
        assert!(c.verify_callback_token(Some("cb-secret")));
        assert!(!c.verify_callback_token(Some("cb-secreT")));
        assert!(!c.verify_callback_token(None));
        assert!(!client("").verify_callback_token(Some("")));
    }

    #[test]
    fn settled_counts_as_paid() {
        assert_eq!(InvoiceStatus::parse("PAID"), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::parse("SETTLED"), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::parse("EXPIRED"), InvoiceStatus::Expired);
        assert_eq!(InvoiceStatus::parse("PENDING"), InvoiceStatus::Other);
    }

    #[test]
    fn paid_callbacks_apply_to_any_issued_invoice() {
        for current in [Some("inv_b"), Some("inv_a"), None] {
            assert_eq!(
                callback_action(InvoiceStatus::Paid, "inv_a", current, PaymentStatus::Pending),
                CallbackAction::MarkPaid
            );
        }
    }

    #[test]
    fn late_expiry_of_replaced_invoice_is_ignored() {
        // Invoice A expired, B was issued, then A's EXPIRED callback lands.
        assert_eq!(
            callback_action(InvoiceStatus::Expired, "inv_a", Some("inv_b"), PaymentStatus::Pending),
            CallbackAction::Ignore
        );
        assert_eq!(
            callback_action(InvoiceStatus::Expired, "inv_b", Some("inv_b"), PaymentStatus::Pending),
            CallbackAction::MarkExpired
        );
    }

    #[test]
    fn paid_appointments_are_never_rewritten() {
        for status in [InvoiceStatus::Paid, InvoiceStatus::Expired, InvoiceStatus::Other] {
            assert_eq!(
                callback_action(status, "inv_a", Some("inv_a"), PaymentStatus::Paid),
                CallbackAction::Ignore
            );
        }
    }

    #[test]
    fn unknown_statuses_are_acknowledged() {
        assert_eq!(
            callback_action(InvoiceStatus::Other, "inv_a", Some("inv_a"), PaymentStatus::Pending),
            CallbackAction::Ignore
        );
    }

    #[test]
    fn invoice_body_serializes_amount_as_number() {
        let body = client("x").invoice_for(
            "appt-1".into(),
            Decimal::new(135050, 2),
            "Ana Cruz",
            "ana@glow.ph",
            "Hydrafacial at Makati".into(),
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["amount"], serde_json::json!(1350.5));
        assert_eq!(json["invoice_duration"], 3600);
        assert_eq!(json["items"][0]["quantity"], 1);
        assert_eq!(json["customer"]["given_names"], "Ana Cruz");
    }
}

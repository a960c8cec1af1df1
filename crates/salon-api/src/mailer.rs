//! Transactional email over SMTP.
//!
//! Sending is best-effort: callers spawn the send and only log failures, so a
//! mail outage never fails a booking.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use salon_common::config::SmtpConfig;
use salon_common::models::appointment::Appointment;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl Mailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(cfg.username.clone(), cfg.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
            .port(cfg.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: cfg.from_address.clone(),
        })
    }

    async fn send_text(&self, to: &str, subject: &str, body: String) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.transport.send(email).await?;
        Ok(())
    }

    /// Booking confirmation for a new appointment.
    pub async fn send_booking_confirmation(
        &self,
        to: &str,
        appointment: &Appointment,
    ) -> Result<(), MailError> {
        self.send_text(to, "Your appointment is booked", confirmation_body(appointment))
            .await?;
        tracing::info!(appointment_id = %appointment.id, "Booking confirmation sent");
        Ok(())
    }
}

/// Plain-text confirmation for a booking.
pub fn confirmation_body(a: &Appointment) -> String {
    let mut body = format!(
        "Hi {name},\n\n\
         Your {service} appointment at {branch} is booked for {when}.\n",
        name = a.customer_name_snapshot,
        service = a.service_name_snapshot,
        branch = a.branch_name_snapshot,
        when = a.start_time.format("%A, %B %-d %Y at %-I:%M %p"),
    );
    if let Some(slot) = a.slot_number {
        body.push_str(&format!("Queue number: {slot}\n"));
    }
    if let Some(aesthetician) = &a.aesthetician_name_snapshot {
        body.push_str(&format!("Aesthetician: {aesthetician}\n"));
    }
    body.push_str(&format!("Total: {}\n", a.final_price));
    if let Some(code) = &a.voucher_code_snapshot {
        body.push_str(&format!("Voucher {code} saved you {}\n", a.voucher_discount));
    }
    body.push_str("\nSee you soon!\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use salon_common::models::{AppointmentStatus, PaymentStatus};
    use uuid::Uuid;

    fn appointment() -> Appointment {
        Appointment {
            id: Uuid::nil(),
            user_id: Some(Uuid::from_u128(1)),
            walk_in_id: None,
            branch_id: Uuid::from_u128(2),
            service_id: Uuid::from_u128(3),
            aesthetician_id: None,
            start_time: NaiveDate::from_ymd_opt(2026, 3, 14)
                .unwrap()
                .and_hms_opt(13, 30, 0)
                .unwrap(),
            duration_minutes: 60,
            status: AppointmentStatus::Pending,
            status_updated_at: None,
            slot_number: Some(4),
            customer_name_snapshot: "Ana Cruz".into(),
            service_name_snapshot: "Hydrafacial".into(),
            branch_name_snapshot: "Makati".into(),
            aesthetician_name_snapshot: None,
            price_snapshot: Decimal::new(1000, 0),
            service_discount: Decimal::ZERO,
            voucher_code_snapshot: Some("GLOW10".into()),
            voucher_discount: Decimal::new(100, 0),
            final_price: Decimal::new(900, 0),
            payment_status: PaymentStatus::Unpaid,
            invoice_id: None,
            invoice_url: None,
            invoice_expires_at: None,
            payment_method: None,
            payment_channel: None,
            paid_at: None,
            notes: None,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn confirmation_mentions_booking_details() {
        let body = confirmation_body(&appointment());
        assert!(body.starts_with("Hi Ana Cruz,"));
        assert!(body.contains("Hydrafacial appointment at Makati"));
        assert!(body.contains("Saturday, March 14 2026 at 1:30 PM"));
        assert!(body.contains("Queue number: 4"));
        assert!(body.contains("Voucher GLOW10 saved you 100"));
        assert!(!body.contains("Aesthetician:"));
    }
}

//! Payment provider callbacks.

use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use chrono::Utc;
use salon_common::{
    error::{SalonError, SalonResult},
    gateway_event::AppointmentEventKind,
    ids,
    models::{Appointment, AppointmentStatus, PaymentStatus},
};
use salon_db::{postgres::lock_branch_day, repository::appointments};
use std::sync::Arc;

use crate::{
    AppState,
    payments::{
        CALLBACK_TOKEN_HEADER, CallbackAction, InvoiceCallback, InvoiceStatus, callback_action,
    },
    routes::appointments::publish,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/payment/webhook", post(invoice_webhook))
}

/// POST /api/v1/payment/webhook
///
/// Paid invoices confirm a pending booking into the waiting queue. Repeated
/// callbacks for an already paid appointment, and expiries of invoices that
/// were since replaced, are acknowledged and ignored.
async fn invoice_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<InvoiceCallback>,
) -> SalonResult<Json<serde_json::Value>> {
    let token = headers
        .get(CALLBACK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if !state.payments.verify_callback_token(token) {
        tracing::warn!(invoice_id = %body.id, "Rejected payment callback with bad token");
        return Err(SalonError::Unauthorized);
    }

    let appointment_id = ids::parse_invoice_external_id(&body.external_id)
        .ok_or_else(|| SalonError::not_found("Appointment"))?;
    let appointment = appointments::find_by_id(&state.db.pg, appointment_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Appointment"))?;

    let status = InvoiceStatus::parse(&body.status);
    let decide = |a: &Appointment| {
        callback_action(status, &body.id, a.invoice_id.as_deref(), a.payment_status)
    };

    if decide(&appointment) == CallbackAction::Ignore {
        tracing::debug!(
            %appointment_id,
            invoice_id = %body.id,
            status = %body.status,
            "Payment callback acknowledged without changes"
        );
        return Ok(Json(serde_json::json!({ "status": true })));
    }

    let mut tx = state.db.pg.begin().await?;
    lock_branch_day(&mut tx, appointment.branch_id, appointment.day()).await?;

    // Decide again on the locked row; a concurrent callback may have won.
    let locked = appointments::find_for_update(&mut tx, appointment_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Appointment"))?;

    match decide(&locked) {
        CallbackAction::MarkPaid => {
            appointments::mark_paid(
                &mut tx,
                appointment_id,
                body.payment_method.as_deref(),
                body.payment_channel.as_deref(),
                body.paid_at.unwrap_or_else(Utc::now),
            )
            .await?;

            if locked.status == AppointmentStatus::Pending {
                appointments::set_status(&mut tx, appointment_id, AppointmentStatus::Waiting)
                    .await?;
                appointments::resequence_day(&mut tx, locked.branch_id, locked.day()).await?;
            }
        }
        CallbackAction::MarkExpired => {
            appointments::set_payment_status(&mut *tx, appointment_id, PaymentStatus::Expired)
                .await?;
        }
        CallbackAction::Ignore => return Ok(Json(serde_json::json!({ "status": true }))),
    }

    let updated = appointments::find_by_id(&mut *tx, appointment_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Appointment"))?;
    tx.commit().await?;

    tracing::info!(
        %appointment_id,
        invoice_id = %body.id,
        status = updated.status.as_str(),
        payment_status = updated.payment_status.as_str(),
        "Payment callback applied"
    );
    publish(&state, AppointmentEventKind::AppointmentUpdated, &updated);

    Ok(Json(serde_json::json!({ "status": true })))
}

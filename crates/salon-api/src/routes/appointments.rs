//! Appointment routes — booking, the front-desk queue, cancellation, invoices.
//!
//! Every write that can change who holds which slot number runs in one
//! transaction holding the advisory lock of each affected (branch, day).

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
};
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use salon_common::{
    error::{SalonError, SalonResult},
    gateway_event::{AppointmentEventKind, GatewayEvent},
    ids,
    models::{
        Aesthetician, Appointment, AppointmentFilter, AppointmentStatus, Branch,
        CreateAppointmentRequest, Owner, Page, PageQuery, PaymentStatus, Role,
        UpdateAppointmentRequest, normalize_code,
    },
    pricing,
    scheduling::{QueueChange, count_overlapping},
    validation::validate_request,
};
use salon_db::{
    postgres::lock_branch_day,
    repository::{
        aestheticians,
        appointments::{self, AppointmentChanges, NewAppointment},
        branches, services, users, vouchers, walk_ins,
    },
};
use serde::Serialize;
use sqlx::PgConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::{AppState, middleware::AuthContext};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/appointment",
            get(list_appointments).post(create_appointment),
        )
        .route("/appointment/mine", get(my_appointments))
        .route(
            "/appointment/{appointment_id}",
            get(get_appointment)
                .patch(update_appointment)
                .delete(delete_appointment),
        )
        .route("/appointment/{appointment_id}/cancel", post(cancel_appointment))
        .route("/appointment/{appointment_id}/invoice", post(create_invoice))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// Push an appointment event to the gateway after the write committed.
pub(crate) fn publish(state: &AppState, kind: AppointmentEventKind, appointment: &Appointment) {
    match serde_json::to_value(appointment) {
        Ok(data) => state.broadcast(GatewayEvent::appointment(
            kind,
            data,
            appointment.branch_id,
            appointment.user_id,
        )),
        Err(e) => tracing::warn!(appointment_id = %appointment.id, "Failed to encode event: {e}"),
    }
}

/// Take the branch-day locks of an edit in its stable order.
async fn lock_queues(conn: &mut PgConnection, change: &QueueChange) -> SalonResult<()> {
    for (branch_id, day) in change.lock_order() {
        lock_branch_day(conn, branch_id, day).await?;
    }
    Ok(())
}

async fn find_appointment(state: &AppState, id: Uuid) -> SalonResult<Appointment> {
    appointments::find_by_id(&state.db.pg, id)
        .await?
        .ok_or_else(|| SalonError::not_found("Appointment"))
}

async fn find_branch(state: &AppState, branch_id: Uuid) -> SalonResult<Branch> {
    branches::find_by_id(&state.db.pg, branch_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Branch"))
}

/// The aesthetician must work at `branch_id` and be taking bookings.
async fn find_bookable_aesthetician(
    state: &AppState,
    aesthetician_id: Uuid,
    branch_id: Uuid,
) -> SalonResult<Aesthetician> {
    let aesthetician = aestheticians::find_by_id(&state.db.pg, aesthetician_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Aesthetician"))?;
    if aesthetician.branch_id != branch_id {
        return Err(SalonError::validation(
            "Aesthetician does not work at the selected branch",
        ));
    }
    if !aesthetician.is_available {
        return Err(SalonError::conflict("Aesthetician is not available"));
    }
    Ok(aesthetician)
}

/// Start must fall inside the working window and not be in the past.
fn check_start(state: &AppState, start: NaiveDateTime, duration_minutes: i32) -> SalonResult<()> {
    if !state.window.contains(start, duration_minutes) {
        return Err(SalonError::validation(
            "Appointment must start and end within working hours",
        ));
    }
    if start < salon_common::config::get().schedule.local_now() {
        return Err(SalonError::validation("Appointment cannot start in the past"));
    }
    Ok(())
}

/// Reject when the window is already covered `capacity` times.
async fn check_capacity(
    conn: &mut PgConnection,
    branch: &Branch,
    start: NaiveDateTime,
    duration_minutes: i32,
    exclude: Option<Uuid>,
) -> SalonResult<()> {
    let booked = appointments::booked_intervals(conn, branch.id, start.date(), exclude).await?;
    if count_overlapping(start, duration_minutes, &booked) >= branch.slot_capacity as usize {
        return Err(SalonError::conflict("The selected time slot is fully booked"));
    }
    Ok(())
}

/// Customers may only touch their own bookings; staff may touch any.
async fn ensure_access(state: &AppState, auth: &AuthContext, appointment: &Appointment) -> SalonResult<()> {
    if auth.role.is_staff() {
        return Ok(());
    }
    let profile = users::find_by_auth_id(&state.db.pg, auth.account_id).await?;
    match (profile, appointment.user_id) {
        (Some(p), Some(owner)) if p.id == owner => Ok(()),
        _ => Err(SalonError::Forbidden),
    }
}

struct Customer {
    owner: Owner,
    name: String,
    email: Option<String>,
}

/// Resolve who a new booking is for.
async fn resolve_customer(
    state: &AppState,
    auth: &AuthContext,
    body: &CreateAppointmentRequest,
) -> SalonResult<Customer> {
    if auth.role == Role::Customer {
        if body.walk_in_id.is_some() {
            return Err(SalonError::Forbidden);
        }
        let profile = users::find_by_auth_id(&state.db.pg, auth.account_id)
            .await?
            .ok_or_else(|| SalonError::not_found("User profile"))?;
        if body.user_id.is_some_and(|id| id != profile.id) {
            return Err(SalonError::Forbidden);
        }
        return Ok(Customer {
            owner: Owner::User(profile.id),
            name: profile.full_name(),
            email: Some(profile.email),
        });
    }

    match Owner::from_ids(body.user_id, body.walk_in_id)? {
        owner @ Owner::User(id) => {
            let user = users::find_by_id(&state.db.pg, id)
                .await?
                .ok_or_else(|| SalonError::not_found("User"))?;
            Ok(Customer {
                owner,
                name: user.full_name(),
                email: Some(user.email),
            })
        }
        owner @ Owner::WalkIn(id) => {
            let walk_in = walk_ins::find_by_id(&state.db.pg, id)
                .await?
                .ok_or_else(|| SalonError::not_found("Walk-in"))?;
            Ok(Customer {
                owner,
                name: walk_in.full_name(),
                email: walk_in.email,
            })
        }
    }
}

/// POST /api/v1/appointment
async fn create_appointment(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAppointmentRequest>,
) -> SalonResult<Json<Appointment>> {
    validate_request(&body)?;

    let customer = resolve_customer(&state, &auth, &body).await?;
    let branch = find_branch(&state, body.branch_id).await?;
    let service = services::find_by_id(&state.db.pg, body.service_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Service"))?;
    let aesthetician = match body.aesthetician_id {
        Some(id) => Some(find_bookable_aesthetician(&state, id, branch.id).await?),
        None => None,
    };

    check_start(&state, body.start_time, service.duration_minutes)?;

    let voucher = match body.voucher_code.as_deref() {
        Some(code) => {
            let voucher = vouchers::find_by_code(&state.db.pg, &normalize_code(code))
                .await?
                .ok_or_else(|| SalonError::not_found("Voucher"))?;
            voucher.check_redeemable(Utc::now())?;
            Some(voucher)
        }
        None => None,
    };

    let quote = pricing::quote(service.price, service.discount_percent, voucher.as_ref());

    let new = NewAppointment {
        id: ids::generate_id(),
        user_id: customer.owner.user_id(),
        walk_in_id: customer.owner.walk_in_id(),
        branch_id: branch.id,
        service_id: service.id,
        aesthetician_id: aesthetician.as_ref().map(|a| a.id),
        start_time: body.start_time,
        duration_minutes: service.duration_minutes,
        customer_name: customer.name,
        service_name: service.name.clone(),
        branch_name: branch.name.clone(),
        aesthetician_name: aesthetician.as_ref().map(Aesthetician::full_name),
        price: quote.base_price,
        service_discount: quote.service_discount,
        voucher_code: quote.voucher_code.clone(),
        voucher_discount: quote.voucher_discount,
        final_price: quote.final_price,
        notes: body.notes.clone(),
    };

    let mut tx = state.db.pg.begin().await?;
    lock_branch_day(&mut tx, branch.id, body.start_time.date()).await?;
    check_capacity(&mut tx, &branch, body.start_time, service.duration_minutes, None).await?;

    if let Some(v) = &voucher {
        if !vouchers::redeem(&mut *tx, v.id).await? {
            return Err(SalonError::conflict("Voucher has been fully redeemed"));
        }
    }

    let appointment = appointments::insert_appointment(&mut tx, &new).await?;
    tx.commit().await?;

    tracing::info!(
        appointment_id = %appointment.id,
        branch_id = %appointment.branch_id,
        slot_number = ?appointment.slot_number,
        booked_by = %auth.account_id,
        "Appointment booked"
    );

    publish(&state, AppointmentEventKind::NewAppointment, &appointment);

    if let (Some(mailer), Some(email)) = (state.mailer.clone(), customer.email) {
        let booked = appointment.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_booking_confirmation(&email, &booked).await {
                tracing::warn!(appointment_id = %booked.id, "Confirmation email failed: {e}");
            }
        });
    }

    Ok(Json(appointment))
}

/// GET /api/v1/appointment (staff)
async fn list_appointments(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AppointmentFilter>,
) -> SalonResult<Json<Page<Appointment>>> {
    auth.require_staff()?;

    let (limit, offset) = PageQuery {
        page: filter.page,
        per_page: filter.per_page,
        search: None,
    }
    .bounds(&salon_common::config::get().limits);

    let (items, total) =
        appointments::list_appointments(&state.db.pg, &filter, limit, offset).await?;
    Ok(Json(Page::new(items, limit, offset, total)))
}

/// GET /api/v1/appointment/mine
async fn my_appointments(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> SalonResult<Json<Page<Appointment>>> {
    let profile = users::find_by_auth_id(&state.db.pg, auth.account_id)
        .await?
        .ok_or_else(|| SalonError::not_found("User profile"))?;

    let (limit, offset) = query.bounds(&salon_common::config::get().limits);
    let (items, total) =
        appointments::list_for_user(&state.db.pg, profile.id, limit, offset).await?;
    Ok(Json(Page::new(items, limit, offset, total)))
}

/// GET /api/v1/appointment/:appointment_id
async fn get_appointment(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> SalonResult<Json<Appointment>> {
    let appointment = find_appointment(&state, appointment_id).await?;
    ensure_access(&state, &auth, &appointment).await?;
    Ok(Json(appointment))
}

/// PATCH /api/v1/appointment/:appointment_id (staff)
///
/// Status, branch and day changes renumber every queue they touch.
async fn update_appointment(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Json(body): Json<UpdateAppointmentRequest>,
) -> SalonResult<Json<Appointment>> {
    auth.require_staff()?;
    validate_request(&body)?;

    let current = find_appointment(&state, appointment_id).await?;

    let next_status = body.status.filter(|s| *s != current.status);
    let touches_schedule = next_status.is_some()
        || body.branch_id.is_some()
        || body.aesthetician_id.is_some()
        || body.start_time.is_some();

    if current.status.is_terminal() && touches_schedule {
        return Err(SalonError::conflict(format!(
            "A {} appointment can no longer be changed",
            current.status.as_str()
        )));
    }
    if let Some(next) = next_status {
        if !current.status.can_transition_to(next) {
            return Err(SalonError::conflict(format!(
                "Cannot move an appointment from {} to {}",
                current.status.as_str(),
                next.as_str()
            )));
        }
    }

    let target_branch = match body.branch_id.filter(|b| *b != current.branch_id) {
        Some(id) => Some(find_branch(&state, id).await?),
        None => None,
    };
    let branch_id = target_branch.as_ref().map_or(current.branch_id, |b| b.id);
    let start_time = body.start_time.unwrap_or(current.start_time);

    let aesthetician = match body.aesthetician_id {
        Some(id) => Some(find_bookable_aesthetician(&state, id, branch_id).await?),
        None => {
            // A branch move can't silently keep an aesthetician from the old branch.
            if target_branch.is_some() && current.aesthetician_id.is_some() {
                return Err(SalonError::validation(
                    "Choose an aesthetician at the new branch",
                ));
            }
            None
        }
    };

    if body.start_time.is_some() {
        check_start(&state, start_time, current.duration_minutes)?;
    }

    let change = QueueChange {
        from: (current.branch_id, current.day()),
        to: (branch_id, start_time.date()),
        status_changed: next_status.is_some(),
        start_changed: body.start_time.is_some(),
        active_after: next_status.unwrap_or(current.status).is_active(),
    };

    let mut tx = state.db.pg.begin().await?;
    lock_queues(&mut tx, &change).await?;

    let locked = appointments::find_for_update(&mut tx, appointment_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Appointment"))?;
    if locked.status != current.status || (locked.branch_id, locked.day()) != change.from {
        return Err(SalonError::conflict(
            "Appointment was changed by someone else, please retry",
        ));
    }

    if change.needs_capacity_check() {
        let branch = match &target_branch {
            Some(b) => b.clone(),
            None => find_branch(&state, current.branch_id).await?,
        };
        check_capacity(
            &mut tx,
            &branch,
            start_time,
            current.duration_minutes,
            Some(appointment_id),
        )
        .await?;
    }

    if change.moved() {
        appointments::release_slot(&mut tx, appointment_id).await?;
    }

    appointments::update_fields(
        &mut tx,
        appointment_id,
        &AppointmentChanges {
            branch_id: target_branch.as_ref().map(|b| b.id),
            branch_name: target_branch.as_ref().map(|b| b.name.clone()),
            aesthetician_id: aesthetician.as_ref().map(|a| a.id),
            aesthetician_name: aesthetician.as_ref().map(Aesthetician::full_name),
            start_time: body.start_time,
            notes: body.notes.clone(),
        },
    )
    .await?;

    if let Some(next) = next_status {
        appointments::set_status(&mut tx, appointment_id, next).await?;
    }

    for (branch_id, day) in change.to_resequence() {
        appointments::resequence_day(&mut tx, branch_id, day).await?;
    }

    let updated = appointments::find_by_id(&mut *tx, appointment_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Appointment"))?;
    tx.commit().await?;

    tracing::info!(
        appointment_id = %updated.id,
        status = updated.status.as_str(),
        slot_number = ?updated.slot_number,
        updated_by = %auth.account_id,
        "Appointment updated"
    );

    publish(&state, AppointmentEventKind::AppointmentUpdated, &updated);
    Ok(Json(updated))
}

/// Move to `status` and renumber the appointment's queue.
pub(crate) async fn change_status(
    state: &AppState,
    current: &Appointment,
    status: AppointmentStatus,
) -> SalonResult<Appointment> {
    let mut tx = state.db.pg.begin().await?;
    lock_branch_day(&mut tx, current.branch_id, current.day()).await?;

    let locked = appointments::find_for_update(&mut tx, current.id)
        .await?
        .ok_or_else(|| SalonError::not_found("Appointment"))?;
    if locked.status != current.status {
        return Err(SalonError::conflict(
            "Appointment was changed by someone else, please retry",
        ));
    }

    appointments::set_status(&mut tx, current.id, status).await?;
    appointments::resequence_day(&mut tx, current.branch_id, current.day()).await?;

    let updated = appointments::find_by_id(&mut *tx, current.id)
        .await?
        .ok_or_else(|| SalonError::not_found("Appointment"))?;
    tx.commit().await?;
    Ok(updated)
}

/// POST /api/v1/appointment/:appointment_id/cancel
///
/// Customers may cancel their own booking while it's pending or waiting.
async fn cancel_appointment(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> SalonResult<Json<Appointment>> {
    let appointment = find_appointment(&state, appointment_id).await?;
    ensure_access(&state, &auth, &appointment).await?;

    let allowed = if auth.role.is_staff() {
        appointment.status.can_transition_to(AppointmentStatus::Cancelled)
    } else {
        appointment.status.customer_cancellable()
    };
    if !allowed {
        return Err(SalonError::conflict(format!(
            "A {} appointment can't be cancelled",
            appointment.status.as_str()
        )));
    }

    let updated = change_status(&state, &appointment, AppointmentStatus::Cancelled).await?;

    tracing::info!(appointment_id = %updated.id, cancelled_by = %auth.account_id, "Appointment cancelled");
    publish(&state, AppointmentEventKind::AppointmentUpdated, &updated);
    Ok(Json(updated))
}

/// DELETE /api/v1/appointment/:appointment_id (admin)
async fn delete_appointment(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> SalonResult<Json<serde_json::Value>> {
    auth.require_admin()?;

    let appointment = find_appointment(&state, appointment_id).await?;

    let mut tx = state.db.pg.begin().await?;
    lock_branch_day(&mut tx, appointment.branch_id, appointment.day()).await?;
    appointments::soft_delete(&mut tx, appointment.id).await?;
    appointments::resequence_day(&mut tx, appointment.branch_id, appointment.day()).await?;
    tx.commit().await?;

    tracing::info!(appointment_id = %appointment.id, deleted_by = %auth.account_id, "Appointment deleted");
    publish(&state, AppointmentEventKind::AppointmentDeleted, &appointment);
    Ok(Json(serde_json::json!({ "status": true })))
}

#[derive(Serialize)]
struct InvoiceResponse {
    appointment_id: Uuid,
    invoice_id: String,
    invoice_url: String,
    expires_at: Option<chrono::DateTime<Utc>>,
    amount: Decimal,
}

/// POST /api/v1/appointment/:appointment_id/invoice
///
/// Issue (or re-issue once expired) a hosted invoice for the booking.
async fn create_invoice(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> SalonResult<Json<InvoiceResponse>> {
    let appointment = find_appointment(&state, appointment_id).await?;
    ensure_access(&state, &auth, &appointment).await?;

    if appointment.payment_status == PaymentStatus::Paid {
        return Err(SalonError::conflict("Appointment is already paid"));
    }
    if appointment.status == AppointmentStatus::Cancelled {
        return Err(SalonError::conflict("Cancelled appointments can't be paid"));
    }
    if appointment.final_price <= Decimal::ZERO {
        return Err(SalonError::conflict("Nothing to pay for this appointment"));
    }

    // An open invoice is reused until it expires.
    if let (PaymentStatus::Pending, Some(id), Some(url)) = (
        appointment.payment_status,
        appointment.invoice_id.clone(),
        appointment.invoice_url.clone(),
    ) {
        if appointment.invoice_expires_at.is_none_or(|at| at > Utc::now()) {
            return Ok(Json(InvoiceResponse {
                appointment_id,
                invoice_id: id,
                invoice_url: url,
                expires_at: appointment.invoice_expires_at,
                amount: appointment.final_price,
            }));
        }
    }

    let payer_email = match (appointment.user_id, appointment.walk_in_id) {
        (Some(user_id), _) => users::find_by_id(&state.db.pg, user_id)
            .await?
            .map(|u| u.email),
        (None, Some(walk_in_id)) => walk_ins::find_by_id(&state.db.pg, walk_in_id)
            .await?
            .and_then(|w| w.email),
        (None, None) => None,
    }
    .ok_or_else(|| SalonError::validation("The customer needs an email address to pay online"))?;

    let request = state.payments.invoice_for(
        ids::invoice_external_id(appointment.id),
        appointment.final_price,
        &appointment.customer_name_snapshot,
        &payer_email,
        format!(
            "{} at {}",
            appointment.service_name_snapshot, appointment.branch_name_snapshot
        ),
    );
    let invoice = state.payments.create_invoice(&request).await?;

    let updated = appointments::set_invoice(
        &state.db.pg,
        appointment.id,
        &invoice.id,
        &invoice.invoice_url,
        invoice.expiry_date,
    )
    .await?;

    publish(&state, AppointmentEventKind::AppointmentUpdated, &updated);

    Ok(Json(InvoiceResponse {
        appointment_id,
        invoice_id: invoice.id,
        invoice_url: invoice.invoice_url,
        expires_at: invoice.expiry_date,
        amount: updated.final_price,
    }))
}

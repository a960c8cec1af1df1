//! Appointment repository — bookings, queue numbers, and payment state.
//!
//! Functions that touch `slot_number` take a `&mut PgConnection` so callers can
//! run them inside one transaction after [`crate::postgres::lock_branch_day`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use salon_common::models::appointment::{
    Appointment, AppointmentFilter, AppointmentStatus, PaymentStatus, active_status_values,
};
use salon_common::scheduling::{self, BookedInterval, QueueEntry};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

/// Everything needed to insert a booking. Snapshots are resolved by the caller.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub walk_in_id: Option<Uuid>,
    pub branch_id: Uuid,
    pub service_id: Uuid,
    pub aesthetician_id: Option<Uuid>,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub customer_name: String,
    pub service_name: String,
    pub branch_name: String,
    pub aesthetician_name: Option<String>,
    pub price: Decimal,
    pub service_discount: Decimal,
    pub voucher_code: Option<String>,
    pub voucher_discount: Decimal,
    pub final_price: Decimal,
    pub notes: Option<String>,
}

/// Staff edits; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct AppointmentChanges {
    pub branch_id: Option<Uuid>,
    pub branch_name: Option<String>,
    pub aesthetician_id: Option<Uuid>,
    pub aesthetician_name: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

/// Active bookings overlapping a (branch, day), optionally skipping one appointment.
pub async fn booked_intervals(
    conn: &mut PgConnection,
    branch_id: Uuid,
    day: NaiveDate,
    exclude: Option<Uuid>,
) -> Result<Vec<BookedInterval>, sqlx::Error> {
    let rows: Vec<(NaiveDateTime, i32)> = sqlx::query_as(
        r#"
        SELECT start_time, duration_minutes FROM appointments
        WHERE branch_id = $1
          AND start_time::date = $2
          AND status = ANY($3)
          AND NOT is_deleted
          AND ($4::uuid IS NULL OR id <> $4)
        ORDER BY start_time
        "#,
    )
    .bind(branch_id)
    .bind(day)
    .bind(active_status_values())
    .bind(exclude)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(start, duration_minutes)| BookedInterval {
            start,
            duration_minutes,
        })
        .collect())
}

/// Same as [`booked_intervals`] without a transaction, for the availability grid.
pub async fn booked_intervals_for_day(
    pool: &PgPool,
    branch_id: Uuid,
    day: NaiveDate,
) -> Result<Vec<BookedInterval>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    booked_intervals(&mut conn, branch_id, day, None).await
}

/// Highest slot number currently held in (branch, day).
pub async fn max_slot_number(
    conn: &mut PgConnection,
    branch_id: Uuid,
    day: NaiveDate,
) -> Result<Option<i32>, sqlx::Error> {
    let row: (Option<i32>,) = sqlx::query_as(
        r#"
        SELECT MAX(slot_number) FROM appointments
        WHERE branch_id = $1
          AND start_time::date = $2
          AND status = ANY($3)
          AND NOT is_deleted
        "#,
    )
    .bind(branch_id)
    .bind(day)
    .bind(active_status_values())
    .fetch_one(conn)
    .await?;
    Ok(row.0)
}

/// Insert a pending booking holding the next slot number of its (branch, day).
///
/// The caller must hold the branch-day lock.
pub async fn insert_appointment(
    conn: &mut PgConnection,
    new: &NewAppointment,
) -> Result<Appointment, sqlx::Error> {
    let current_max = max_slot_number(&mut *conn, new.branch_id, new.start_time.date()).await?;
    let slot_number = scheduling::next_slot_number(current_max);

    sqlx::query_as::<_, Appointment>(
        r#"
        INSERT INTO appointments (
            id, user_id, walk_in_id, branch_id, service_id, aesthetician_id,
            start_time, duration_minutes, status, status_updated_at, slot_number,
            customer_name_snapshot, service_name_snapshot, branch_name_snapshot,
            aesthetician_name_snapshot, price_snapshot, service_discount,
            voucher_code_snapshot, voucher_discount, final_price,
            payment_status, notes, is_deleted, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', NOW(), $9,
                $10, $11, $12, $13, $14, $15, $16, $17, $18,
                'unpaid', $19, false, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(new.id)
    .bind(new.user_id)
    .bind(new.walk_in_id)
    .bind(new.branch_id)
    .bind(new.service_id)
    .bind(new.aesthetician_id)
    .bind(new.start_time)
    .bind(new.duration_minutes)
    .bind(slot_number)
    .bind(&new.customer_name)
    .bind(&new.service_name)
    .bind(&new.branch_name)
    .bind(&new.aesthetician_name)
    .bind(new.price)
    .bind(new.service_discount)
    .bind(&new.voucher_code)
    .bind(new.voucher_discount)
    .bind(new.final_price)
    .bind(&new.notes)
    .fetch_one(conn)
    .await
}

pub async fn find_by_id<'e, E>(exec: E, id: Uuid) -> Result<Option<Appointment>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .fetch_optional(exec)
    .await
}

/// Lock the row for the rest of the transaction.
pub async fn find_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE id = $1 AND NOT is_deleted FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Staff listing, newest start first.
pub async fn list_appointments(
    pool: &PgPool,
    filter: &AppointmentFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Appointment>, i64), sqlx::Error> {
    let clause = r#"
        WHERE NOT is_deleted
          AND ($1::uuid IS NULL OR branch_id = $1)
          AND ($2::date IS NULL OR start_time::date = $2)
          AND ($3::text IS NULL OR status = $3)
          AND ($4::text IS NULL OR payment_status = $4)
    "#;

    let items = sqlx::query_as::<_, Appointment>(&format!(
        "SELECT * FROM appointments {clause} ORDER BY start_time DESC, slot_number LIMIT $5 OFFSET $6"
    ))
    .bind(filter.branch_id)
    .bind(filter.date)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.payment_status.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM appointments {clause}"))
        .bind(filter.branch_id)
        .bind(filter.date)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.payment_status.map(|s| s.as_str()))
        .fetch_one(pool)
        .await?;

    Ok((items, total.0))
}

/// A customer's own bookings.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Appointment>, i64), sqlx::Error> {
    let items = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT * FROM appointments
        WHERE user_id = $1 AND NOT is_deleted
        ORDER BY start_time DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM appointments WHERE user_id = $1 AND NOT is_deleted",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok((items, total.0))
}

/// Apply field edits. Slot numbers are left for [`resequence_day`].
pub async fn update_fields(
    conn: &mut PgConnection,
    id: Uuid,
    changes: &AppointmentChanges,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE appointments SET
            branch_id = COALESCE($2, branch_id),
            branch_name_snapshot = COALESCE($3, branch_name_snapshot),
            aesthetician_id = COALESCE($4, aesthetician_id),
            aesthetician_name_snapshot = COALESCE($5, aesthetician_name_snapshot),
            start_time = COALESCE($6, start_time),
            notes = COALESCE($7, notes),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(changes.branch_id)
    .bind(&changes.branch_name)
    .bind(changes.aesthetician_id)
    .bind(&changes.aesthetician_name)
    .bind(changes.start_time)
    .bind(&changes.notes)
    .execute(conn)
    .await?;
    Ok(())
}

/// Move to a new status and restart its queue clock.
pub async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: AppointmentStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE appointments SET
            status = $2,
            status_updated_at = NOW(),
            slot_number = CASE WHEN $3 THEN slot_number ELSE NULL END,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(status.is_active())
    .execute(conn)
    .await?;
    Ok(())
}

/// Renumber the active queue of (branch, day) to `1..=k`.
///
/// Every slot in the group is cleared first so the unique index never sees
/// two rows holding the same number mid-update. The caller must hold the
/// branch-day lock.
pub async fn resequence_day(
    conn: &mut PgConnection,
    branch_id: Uuid,
    day: NaiveDate,
) -> Result<usize, sqlx::Error> {
    let rows: Vec<(Uuid, Option<DateTime<Utc>>, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT id, status_updated_at, created_at FROM appointments
        WHERE branch_id = $1
          AND start_time::date = $2
          AND status = ANY($3)
          AND NOT is_deleted
        "#,
    )
    .bind(branch_id)
    .bind(day)
    .bind(active_status_values())
    .fetch_all(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE appointments SET slot_number = NULL
        WHERE branch_id = $1 AND start_time::date = $2 AND slot_number IS NOT NULL
        "#,
    )
    .bind(branch_id)
    .bind(day)
    .execute(&mut *conn)
    .await?;

    let entries: Vec<QueueEntry> = rows
        .into_iter()
        .map(|(id, status_updated_at, created_at)| QueueEntry {
            id,
            status_updated_at,
            created_at,
        })
        .collect();
    let assignments = scheduling::resequence(&entries);

    if !assignments.is_empty() {
        let (ids, numbers): (Vec<Uuid>, Vec<i32>) = assignments.into_iter().unzip();
        sqlx::query(
            r#"
            UPDATE appointments AS a SET slot_number = v.slot_number
            FROM UNNEST($1::uuid[], $2::int4[]) AS v(id, slot_number)
            WHERE a.id = v.id
            "#,
        )
        .bind(&ids)
        .bind(&numbers)
        .execute(&mut *conn)
        .await?;
        tracing::debug!(%branch_id, %day, count = ids.len(), "Resequenced slot numbers");
        return Ok(ids.len());
    }

    Ok(0)
}

/// Record an issued invoice.
pub async fn set_invoice(
    pool: &PgPool,
    id: Uuid,
    invoice_id: &str,
    invoice_url: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Appointment, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        r#"
        UPDATE appointments SET
            invoice_id = $2,
            invoice_url = $3,
            invoice_expires_at = $4,
            payment_status = 'pending',
            updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(invoice_id)
    .bind(invoice_url)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// Record a settled payment.
pub async fn mark_paid(
    conn: &mut PgConnection,
    id: Uuid,
    payment_method: Option<&str>,
    payment_channel: Option<&str>,
    paid_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE appointments SET
            payment_status = 'paid',
            payment_method = $2,
            payment_channel = $3,
            paid_at = $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(payment_method)
    .bind(payment_channel)
    .bind(paid_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Set a non-paid payment status (expired, failed).
pub async fn set_payment_status<'e, E>(
    exec: E,
    id: Uuid,
    status: PaymentStatus,
) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE appointments SET payment_status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(exec)
        .await?;
    Ok(())
}

/// Drop the slot number ahead of a move into another (branch, day) queue.
pub async fn release_slot(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE appointments SET slot_number = NULL WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Soft-delete and release the slot number.
pub async fn soft_delete(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE appointments SET is_deleted = true, slot_number = NULL, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

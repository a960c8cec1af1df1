//! PostgreSQL setup and connection helpers.

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Health check — verify the database is reachable.
pub async fn health_check(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .is_ok()
}

/// Serialize slot-number work for one (branch, day) until the transaction ends.
///
/// Two bookings for the same branch and day would otherwise both read the same
/// maximum slot number and write duplicates.
pub async fn lock_branch_day(
    conn: &mut PgConnection,
    branch_id: Uuid,
    day: NaiveDate,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("slots:{branch_id}:{day}"))
        .execute(conn)
        .await?;
    Ok(())
}

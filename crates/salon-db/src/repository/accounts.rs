//! Auth account repository — credentials and roles.

use salon_common::models::account::{Account, Role};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Create a login.
pub async fn create_account<'e, E>(
    exec: E,
    id: Uuid,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<Account, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        r#"
        INSERT INTO auth (id, email, password_hash, role, is_deleted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, false, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(exec)
    .await
}

/// Find a live account by its ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>("SELECT * FROM auth WHERE id = $1 AND NOT is_deleted")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Find a live account by email (case-insensitive).
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        "SELECT * FROM auth WHERE LOWER(email) = LOWER($1) AND NOT is_deleted",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Replace the password hash.
pub async fn update_password(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE auth SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Soft-delete a login so it can no longer authenticate.
pub async fn soft_delete<'e, E>(exec: E, id: Uuid) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE auth SET is_deleted = true, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}

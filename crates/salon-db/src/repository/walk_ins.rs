//! Walk-in customer repository.

use salon_common::models::walk_in::WalkIn;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_walk_in(
    pool: &PgPool,
    id: Uuid,
    first_name: &str,
    last_name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    created_by: Uuid,
) -> Result<WalkIn, sqlx::Error> {
    sqlx::query_as::<_, WalkIn>(
        r#"
        INSERT INTO walk_ins (id, first_name, last_name, email, phone, created_by, is_deleted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, false, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(phone)
    .bind(created_by)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<WalkIn>, sqlx::Error> {
    sqlx::query_as::<_, WalkIn>("SELECT * FROM walk_ins WHERE id = $1 AND NOT is_deleted")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List walk-ins, newest first, optionally filtered by an ILIKE pattern.
pub async fn list_walk_ins(
    pool: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<WalkIn>, i64), sqlx::Error> {
    let filter = r#"
        WHERE NOT is_deleted
          AND ($1::text IS NULL
               OR first_name ILIKE $1 OR last_name ILIKE $1
               OR email ILIKE $1 OR phone ILIKE $1)
    "#;

    let items = sqlx::query_as::<_, WalkIn>(&format!(
        "SELECT * FROM walk_ins {filter} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM walk_ins {filter}"))
        .bind(search)
        .fetch_one(pool)
        .await?;

    Ok((items, total.0))
}

pub async fn update_walk_in(
    pool: &PgPool,
    id: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<WalkIn, sqlx::Error> {
    sqlx::query_as::<_, WalkIn>(
        r#"
        UPDATE walk_ins SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            email = COALESCE($4, email),
            phone = COALESCE($5, phone),
            updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(phone)
    .fetch_one(pool)
    .await
}

/// Returns false when nothing was deleted.
pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE walk_ins SET is_deleted = true, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

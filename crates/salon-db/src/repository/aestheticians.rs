//! Aesthetician repository.

use salon_common::models::aesthetician::{
    Aesthetician, AestheticianFilter, CreateAestheticianRequest, UpdateAestheticianRequest,
};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_aesthetician(
    pool: &PgPool,
    id: Uuid,
    req: &CreateAestheticianRequest,
) -> Result<Aesthetician, sqlx::Error> {
    sqlx::query_as::<_, Aesthetician>(
        r#"
        INSERT INTO aestheticians
            (id, branch_id, first_name, last_name, sex, experience, is_available, is_deleted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, false, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.branch_id)
    .bind(req.first_name.trim())
    .bind(req.last_name.trim())
    .bind(&req.sex)
    .bind(req.experience)
    .bind(req.is_available.unwrap_or(true))
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Aesthetician>, sqlx::Error> {
    sqlx::query_as::<_, Aesthetician>(
        "SELECT * FROM aestheticians WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_aestheticians(
    pool: &PgPool,
    filter: &AestheticianFilter,
) -> Result<Vec<Aesthetician>, sqlx::Error> {
    sqlx::query_as::<_, Aesthetician>(
        r#"
        SELECT * FROM aestheticians
        WHERE NOT is_deleted
          AND ($1::uuid IS NULL OR branch_id = $1)
          AND ($2::boolean IS NULL OR is_available = $2)
        ORDER BY last_name, first_name
        "#,
    )
    .bind(filter.branch_id)
    .bind(filter.available)
    .fetch_all(pool)
    .await
}

pub async fn update_aesthetician(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateAestheticianRequest,
) -> Result<Aesthetician, sqlx::Error> {
    sqlx::query_as::<_, Aesthetician>(
        r#"
        UPDATE aestheticians SET
            branch_id = COALESCE($2, branch_id),
            first_name = COALESCE($3, first_name),
            last_name = COALESCE($4, last_name),
            sex = COALESCE($5, sex),
            experience = COALESCE($6, experience),
            is_available = COALESCE($7, is_available),
            updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.branch_id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.sex)
    .bind(req.experience)
    .bind(req.is_available)
    .fetch_one(pool)
    .await
}

pub async fn set_image(pool: &PgPool, id: Uuid, image_url: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE aestheticians SET image_url = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(image_url)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE aestheticians SET is_deleted = true, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

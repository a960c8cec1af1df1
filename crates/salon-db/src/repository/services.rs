//! Service catalog repository.

use rust_decimal::Decimal;
use salon_common::models::service::{
    CreateServiceRequest, Service, ServiceFilter, UpdateServiceRequest,
};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_service(
    pool: &PgPool,
    id: Uuid,
    req: &CreateServiceRequest,
) -> Result<Service, sqlx::Error> {
    sqlx::query_as::<_, Service>(
        r#"
        INSERT INTO services
            (id, name, category, description, price, duration_minutes, discount_percent, is_deleted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, false, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.name.trim())
    .bind(req.category.trim())
    .bind(&req.description)
    .bind(req.price)
    .bind(req.duration_minutes)
    .bind(req.discount_percent.unwrap_or(Decimal::ZERO))
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Service>, sqlx::Error> {
    sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1 AND NOT is_deleted")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List live services; `search` is an ILIKE pattern.
pub async fn list_services(
    pool: &PgPool,
    filter: &ServiceFilter,
    search: Option<&str>,
) -> Result<Vec<Service>, sqlx::Error> {
    sqlx::query_as::<_, Service>(
        r#"
        SELECT * FROM services
        WHERE NOT is_deleted
          AND ($1::text IS NULL OR LOWER(category) = LOWER($1))
          AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2)
        ORDER BY category, name
        "#,
    )
    .bind(&filter.category)
    .bind(search)
    .fetch_all(pool)
    .await
}

pub async fn update_service(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateServiceRequest,
) -> Result<Service, sqlx::Error> {
    sqlx::query_as::<_, Service>(
        r#"
        UPDATE services SET
            name = COALESCE($2, name),
            category = COALESCE($3, category),
            description = COALESCE($4, description),
            price = COALESCE($5, price),
            duration_minutes = COALESCE($6, duration_minutes),
            discount_percent = COALESCE($7, discount_percent),
            updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.category)
    .bind(&req.description)
    .bind(req.price)
    .bind(req.duration_minutes)
    .bind(req.discount_percent)
    .fetch_one(pool)
    .await
}

pub async fn set_image(pool: &PgPool, id: Uuid, image_url: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE services SET image_url = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(image_url)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE services SET is_deleted = true, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

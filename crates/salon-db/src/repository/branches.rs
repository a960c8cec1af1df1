//! Branch repository — locations and their addresses.

use salon_common::models::branch::{AddressInput, Branch, UpdateBranchRequest};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_BRANCH: &str = r#"
    SELECT b.id, b.name, b.phone, b.slot_capacity, b.image_url, b.address_id,
           a.street, a.city, a.province, a.postal_code,
           b.is_deleted, b.created_at, b.updated_at
    FROM branches b
    INNER JOIN addresses a ON a.id = b.address_id
"#;

/// Create a branch together with its address row.
pub async fn create_branch(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    phone: Option<&str>,
    slot_capacity: i32,
    address: &AddressInput,
) -> Result<Branch, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let address_id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO addresses (id, street, city, province, postal_code) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(address_id)
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.province)
    .bind(&address.postal_code)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO branches (id, name, phone, slot_capacity, address_id, is_deleted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, false, NOW(), NOW())
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(phone)
    .bind(slot_capacity)
    .bind(address_id)
    .execute(&mut *tx)
    .await?;

    let branch = sqlx::query_as::<_, Branch>(&format!("{SELECT_BRANCH} WHERE b.id = $1"))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(branch)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Branch>, sqlx::Error> {
    sqlx::query_as::<_, Branch>(&format!(
        "{SELECT_BRANCH} WHERE b.id = $1 AND NOT b.is_deleted"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// List live branches, optionally filtered by name or city.
pub async fn list_branches(
    pool: &PgPool,
    search: Option<&str>,
) -> Result<Vec<Branch>, sqlx::Error> {
    sqlx::query_as::<_, Branch>(&format!(
        r#"{SELECT_BRANCH}
        WHERE NOT b.is_deleted
          AND ($1::text IS NULL OR b.name ILIKE $1 OR a.city ILIKE $1)
        ORDER BY b.name"#
    ))
    .bind(search)
    .fetch_all(pool)
    .await
}

/// Apply a partial update to the branch and its address.
pub async fn update_branch(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateBranchRequest,
) -> Result<Branch, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let address_id: (Uuid,) = sqlx::query_as(
        r#"
        UPDATE branches SET
            name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            slot_capacity = COALESCE($4, slot_capacity),
            updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        RETURNING address_id
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.phone)
    .bind(req.slot_capacity)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE addresses SET
            street = COALESCE($2, street),
            city = COALESCE($3, city),
            province = COALESCE($4, province),
            postal_code = COALESCE($5, postal_code)
        WHERE id = $1
        "#,
    )
    .bind(address_id.0)
    .bind(&req.street)
    .bind(&req.city)
    .bind(&req.province)
    .bind(&req.postal_code)
    .execute(&mut *tx)
    .await?;

    let branch = sqlx::query_as::<_, Branch>(&format!("{SELECT_BRANCH} WHERE b.id = $1"))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(branch)
}

pub async fn set_image(pool: &PgPool, id: Uuid, image_url: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE branches SET image_url = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(image_url)
        .execute(pool)
        .await?;
    Ok(())
}

/// Returns false when nothing was deleted.
pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE branches SET is_deleted = true, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
